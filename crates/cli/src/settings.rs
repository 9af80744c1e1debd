//! Device settings resolution for the CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ncgroups_ssh::DeviceConfig;

/// Connection flags shared by every device command
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Settings file (defaults to /etc/ncgroups/device.toml or ./ncgroups.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Device address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// NETCONF port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Login user
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Login password (NCGROUPS_PASSWORD is read when omitted)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Private key file; takes precedence over the password
    #[arg(long, global = true)]
    pub ssh_key_file: Option<PathBuf>,
}

impl ConnectionArgs {
    /// Settings file (or the default locations), overridden by explicit flags
    pub fn resolve(&self) -> Result<DeviceConfig> {
        let mut settings = match &self.config {
            Some(path) => DeviceConfig::load_from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => DeviceConfig::load_with_defaults().context("Failed to load settings")?,
        };
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    pub fn apply_overrides(&self, settings: &mut DeviceConfig) {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(username) = &self.username {
            settings.username = username.clone();
        }
        if let Some(password) = &self.password {
            settings.password = Some(password.clone());
        }
        if let Some(path) = &self.ssh_key_file {
            settings.ssh_key_file = Some(path.clone());
        }
    }
}
