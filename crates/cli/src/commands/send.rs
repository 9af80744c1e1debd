//! Unscoped writes: merge, commit, raw RPC

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ncgroups_client::ConfigClient;

use super::group::read_payload;

pub struct SendCommand {
    client: Arc<dyn ConfigClient>,
}

impl SendCommand {
    pub fn new(client: Arc<dyn ConfigClient>) -> Self {
        Self { client }
    }

    /// Merge the payload in `payload_path` without deleting anything
    pub async fn send_config(&self, payload_path: &Path, commit: bool) -> Result<String> {
        let payload = read_payload(payload_path)?;
        self.client
            .send_raw_config(&payload, commit)
            .await
            .context("Failed to load configuration")
    }

    pub async fn commit(&self) -> Result<()> {
        self.client.commit().await.context("Commit failed")
    }

    /// Send the message in `message_path` exactly as written
    pub async fn rpc(&self, message_path: &Path) -> Result<String> {
        let message = read_payload(message_path)?;
        self.client
            .send_raw_netconf_config(&message)
            .await
            .context("RPC failed")
    }
}
