//! Settings commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ncgroups_ssh::{select_auth, DeviceConfig};
use serde_json::Value;

const SECRET_FIELDS: [&str; 3] = ["password", "ssh_key", "ssh_key_passphrase"];

pub struct ConfigCommand;

impl ConfigCommand {
    /// Example settings file, written to `output` when given
    pub fn generate(output: Option<&Path>) -> Result<String> {
        let example = DeviceConfig::example_toml()?;
        if let Some(path) = output {
            fs::write(path, &example)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("example settings written to {}", path.display());
        }
        Ok(example)
    }

    /// Effective settings as JSON with secrets masked
    pub fn show(settings: &DeviceConfig) -> Result<String> {
        let mut value = serde_json::to_value(settings)?;
        if let Value::Object(fields) = &mut value {
            for name in SECRET_FIELDS {
                if let Some(field) = fields.get_mut(name) {
                    if !field.is_null() {
                        *field = Value::String("<redacted>".to_string());
                    }
                }
            }
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Check settings and credentials without contacting the device
    pub fn validate(settings: &DeviceConfig) -> Result<String> {
        settings.validate()?;
        let auth = select_auth(settings).context("Credentials are not usable")?;
        Ok(format!(
            "settings for {}@{}:{} are valid ({} authentication)",
            settings.username,
            settings.host,
            settings.port,
            auth.kind()
        ))
    }
}
