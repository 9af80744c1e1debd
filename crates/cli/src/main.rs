//! ncgroups command-line tool

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ncgroups_cli::commands::{ConfigCommand, GroupCommand, SendCommand};
use ncgroups_cli::ConnectionArgs;
use ncgroups_client::ConfigClient;

#[derive(Parser)]
#[command(name = "ncgroups")]
#[command(about = "Manage configuration apply-groups over NETCONF")]
#[command(version)]
#[command(long_about = "
Manage configuration apply-groups over NETCONF

Every command opens its own session, sends its messages in order and closes
the session again.

Examples:
  ncgroups --host 192.0.2.1 -u admin read-group web          # Committed group text
  ncgroups read-group web --xml                               # Group as XML
  ncgroups replace web --file web.xml                         # Replace and commit
  ncgroups replace web --file web.xml --no-commit             # Stage only
  ncgroups delete web                                         # Delete and commit
  ncgroups commit                                             # Commit staged changes
  ncgroups generate-config -o ncgroups.toml                   # Example settings
")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the committed contents of a group
    ReadGroup {
        group: String,

        /// Print the XML form instead of text
        #[arg(long)]
        xml: bool,
    },

    /// Replace a group with an XML payload
    Replace {
        group: String,

        /// File holding the XML payload
        #[arg(short, long)]
        file: PathBuf,

        /// Leave the change in the candidate configuration
        #[arg(long)]
        no_commit: bool,
    },

    /// Merge an XML payload without deleting anything first
    SendConfig {
        /// File holding the XML payload
        #[arg(short, long)]
        file: PathBuf,

        /// Leave the change in the candidate configuration
        #[arg(long)]
        no_commit: bool,
    },

    /// Delete a group and its apply-groups reference
    Delete {
        group: String,

        /// Leave the change in the candidate configuration
        #[arg(long)]
        no_commit: bool,
    },

    /// Commit the candidate configuration
    Commit,

    /// Send a protocol message exactly as written
    Rpc {
        /// File holding the message
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check settings and credentials without connecting
    Validate,

    /// Print the effective settings (secrets masked)
    ShowConfig,

    /// Generate an example settings file
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = run(&cli).await;

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if cli.verbose || cli.debug {
                for cause in e.chain().skip(1) {
                    eprintln!("  Caused by: {}", cause);
                }
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<String> {
    if let Commands::GenerateConfig { output } = &cli.command {
        return ConfigCommand::generate(output.as_deref());
    }

    let settings = cli.connection.resolve()?;
    let client = match &cli.command {
        Commands::Validate => return ConfigCommand::validate(&settings),
        Commands::ShowConfig => return ConfigCommand::show(&settings),
        _ => ncgroups_ssh::new_client(&settings)?,
    };

    let output = match &cli.command {
        Commands::ReadGroup { group, xml } => GroupCommand::new(client.clone()).read(group, *xml).await,
        Commands::Replace {
            group,
            file,
            no_commit,
        } => GroupCommand::new(client.clone()).replace(group, file, !no_commit).await,
        Commands::Delete { group, no_commit } => {
            GroupCommand::new(client.clone()).delete(group, !no_commit).await
        }
        Commands::SendConfig { file, no_commit } => {
            SendCommand::new(client.clone()).send_config(file, !no_commit).await
        }
        Commands::Commit => SendCommand::new(client.clone())
            .commit()
            .await
            .map(|()| "commit complete".to_string()),
        Commands::Rpc { file } => SendCommand::new(client.clone()).rpc(file).await,
        Commands::Validate | Commands::ShowConfig | Commands::GenerateConfig { .. } => {
            Ok(String::new())
        }
    };

    client.close().await?;
    output
}
