//! Group commands: read, replace, delete

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ncgroups_client::ConfigClient;

/// Operations on one apply-group
pub struct GroupCommand {
    client: Arc<dyn ConfigClient>,
}

impl GroupCommand {
    pub fn new(client: Arc<dyn ConfigClient>) -> Self {
        Self { client }
    }

    /// Committed contents of `group`, as text or raw XML
    pub async fn read(&self, group: &str, xml: bool) -> Result<String> {
        let body = if xml {
            self.client.read_raw_group(group).await
        } else {
            self.client.read_group(group).await
        };
        body.with_context(|| format!("Failed to read group '{}'", group))
    }

    /// Replace `group` with the XML payload in `payload_path`
    pub async fn replace(&self, group: &str, payload_path: &Path, commit: bool) -> Result<String> {
        let payload = read_payload(payload_path)?;
        let reply = self
            .client
            .replace_group_raw(group, &payload, commit)
            .await
            .with_context(|| format!("Failed to replace group '{}'", group))?;

        log::info!(
            "group '{}' replaced{}",
            group,
            if commit { " and committed" } else { "" }
        );
        Ok(reply)
    }

    pub async fn delete(&self, group: &str, commit: bool) -> Result<String> {
        let result = if commit {
            self.client.delete_group(group).await
        } else {
            self.client.delete_group_no_commit(group).await
        };
        result.with_context(|| format!("Failed to delete group '{}'", group))
    }
}

pub(crate) fn read_payload(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("Payload file not found: {}", path.display());
    }
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))
}
