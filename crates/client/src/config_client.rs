//! Client capability exposed to callers

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use ncgroups_core::Result;

use crate::codec;

/// Configuration-group operations against one device.
///
/// Every call is a complete session cycle; implementations must serialize
/// calls so that messages of two calls never interleave.
#[async_trait]
pub trait ConfigClient: Send + Sync {
    /// Committed text form of `group`
    async fn read_group(&self, group: &str) -> Result<String>;

    /// XML form of `group`, unparsed
    async fn read_raw_group(&self, group: &str) -> Result<String>;

    /// Delete `group` (when non-empty), merge `payload`, optionally commit.
    /// Returns the merge reply.
    async fn replace_group_raw(&self, group: &str, payload: &str, commit: bool)
        -> Result<String>;

    /// Delete `group` and commit
    async fn delete_group(&self, group: &str) -> Result<String>;

    /// Delete `group` without committing
    async fn delete_group_no_commit(&self, group: &str) -> Result<String>;

    async fn commit(&self) -> Result<()>;

    /// Merge `payload` without deleting anything first
    async fn send_raw_config(&self, payload: &str, commit: bool) -> Result<String>;

    /// Send `message` exactly as given
    async fn send_raw_netconf_config(&self, message: &str) -> Result<String>;

    /// Release the underlying driver. Later calls fail.
    async fn close(&self) -> Result<()>;
}

/// Structured helpers available on every [`ConfigClient`]
#[async_trait]
pub trait ConfigClientExt: ConfigClient {
    /// Read `group` as XML and decode it into `T`
    async fn marshal_group<T>(&self, group: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let body = self.read_raw_group(group).await?;
        codec::decode(&body)
    }

    /// Read `group` as XML and decode it over `target`
    async fn marshal_into<T>(&self, group: &str, target: &mut T) -> Result<()>
    where
        T: DeserializeOwned + Send,
    {
        *target = self.marshal_group(group).await?;
        Ok(())
    }

    /// Encode `source` and write it: replacing `group` when one is named,
    /// merging additively otherwise
    async fn send_transaction<T>(&self, group: &str, source: &T, commit: bool) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let payload = codec::encode(source)?;

        if group.is_empty() {
            self.send_raw_config(&payload, commit).await?;
        } else {
            self.replace_group_raw(group, &payload, commit).await?;
        }
        Ok(())
    }
}

impl<C: ConfigClient + ?Sized> ConfigClientExt for C {}
