//! Serialized transaction client over one session driver

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::Mutex;

use ncgroups_core::{protocol, ClientError, Result, SessionDriver, Step};

use crate::config_client::ConfigClient;
use crate::reply;
use crate::transaction::{Timeouts, Transaction, TransactionOutcome};

/// Transaction client owning one session driver.
///
/// All operations take the same lock for their whole dial, send, close cycle,
/// so no two transactions ever interleave on the driver. The lock is always
/// taken exclusively; there is no shared read path because every exchange
/// with the device may change its state.
pub struct TransactionClient<D = Box<dyn SessionDriver>> {
    driver: Mutex<Option<D>>,
    timeouts: Timeouts,
}

impl<D: SessionDriver> TransactionClient<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Mutex::new(Some(driver)),
            timeouts: Timeouts::default(),
        }
    }

    /// Bound dial, each send and close by `timeouts`
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Run `transaction` with the lock held from dial until close completes
    pub async fn run(&self, mut transaction: Transaction) -> Result<TransactionOutcome> {
        let mut guard = self.driver.lock().await;
        let driver = guard.as_mut().ok_or(ClientError::Closed)?;
        transaction.execute(driver, &self.timeouts).await
    }

    async fn delete(&self, group: &str, commit: bool) -> Result<String> {
        let operation = if commit {
            "delete_group"
        } else {
            "delete_group_no_commit"
        };
        let transaction = Transaction::new(operation)
            .step(Step::Delete, protocol::delete_group(group))
            .step_if(commit, Step::Commit, protocol::COMMIT);

        let data = self.run(transaction).await?.into_data(Step::Delete);
        Ok(data.replace('\n', ""))
    }
}

impl TransactionClient {
    /// Client over a type-erased driver
    pub fn boxed<D: SessionDriver + 'static>(driver: D) -> Self {
        TransactionClient::new(Box::new(driver) as Box<dyn SessionDriver>)
    }
}

#[async_trait]
impl<D: SessionDriver> ConfigClient for TransactionClient<D> {
    async fn read_group(&self, group: &str) -> Result<String> {
        let transaction =
            Transaction::new("read_group").step(Step::Read, protocol::get_group_text(group));
        let data = self.run(transaction).await?.into_data(Step::Read);
        reply::parse_group_text(group, &data)
    }

    async fn read_raw_group(&self, group: &str) -> Result<String> {
        let transaction =
            Transaction::new("read_raw_group").step(Step::Read, protocol::get_group_xml(group));
        Ok(self.run(transaction).await?.into_data(Step::Read))
    }

    async fn replace_group_raw(
        &self,
        group: &str,
        payload: &str,
        commit: bool,
    ) -> Result<String> {
        // Merge is additive; only a prior delete drops statements missing from the new payload.
        let transaction = Transaction::new("replace_group")
            .step_if(!group.is_empty(), Step::Delete, protocol::delete_group(group))
            .step(Step::Merge, protocol::load_merge(payload))
            .step_if(commit, Step::Commit, protocol::COMMIT);

        debug!(
            "replacing group '{}' ({} byte payload, commit={})",
            group,
            payload.len(),
            commit
        );
        Ok(self.run(transaction).await?.into_data(Step::Merge))
    }

    async fn delete_group(&self, group: &str) -> Result<String> {
        self.delete(group, true).await
    }

    async fn delete_group_no_commit(&self, group: &str) -> Result<String> {
        self.delete(group, false).await
    }

    async fn commit(&self) -> Result<()> {
        let transaction = Transaction::new("commit").step(Step::Commit, protocol::COMMIT);
        self.run(transaction).await?;
        Ok(())
    }

    async fn send_raw_config(&self, payload: &str, commit: bool) -> Result<String> {
        let transaction = Transaction::new("send_raw_config")
            .step(Step::Merge, protocol::load_merge(payload))
            .step_if(commit, Step::Commit, protocol::COMMIT);
        Ok(self.run(transaction).await?.into_data(Step::Merge))
    }

    async fn send_raw_netconf_config(&self, message: &str) -> Result<String> {
        let transaction = Transaction::new("send_raw_netconf_config").step(Step::Raw, message);
        Ok(self.run(transaction).await?.into_data(Step::Raw))
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.driver.lock().await;
        if guard.take().is_some() {
            info!("transaction client closed");
        }
        Ok(())
    }
}
