//! Transactional message sequencing against a single session

use std::future::Future;
use std::time::Duration;

use log::{debug, error, info, warn};

use ncgroups_core::{ClientError, Reply, Result, SessionDriver, Step, TransportError};

/// Per-phase time limits. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub dial: Option<Duration>,
    pub send: Option<Duration>,
    pub close: Option<Duration>,
}

impl Timeouts {
    /// Same limit for every phase
    pub fn uniform(limit: Duration) -> Self {
        Self {
            dial: Some(limit),
            send: Some(limit),
            close: Some(limit),
        }
    }
}

/// Transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Built but not started
    Idle,
    /// Session established
    Dialed,
    /// Waiting for the reply to a step
    Sending(Step),
    /// All steps done and session closed
    Closed,
    /// Aborted at the given step
    Failed(Step),
}

/// One message of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStep {
    pub step: Step,
    pub message: String,
}

/// Ordered protocol messages executed against one session.
///
/// Runs as dial, each message in order, close. The first failure aborts the
/// remaining messages and closes the session before returning.
#[derive(Debug, Clone)]
pub struct Transaction {
    operation: &'static str,
    steps: Vec<TransactionStep>,
    state: TransactionState,
}

impl Transaction {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
            state: TransactionState::Idle,
        }
    }

    /// Append a message
    pub fn step(mut self, step: Step, message: impl Into<String>) -> Self {
        self.steps.push(TransactionStep {
            step,
            message: message.into(),
        });
        self
    }

    /// Append a message only when `condition` holds
    pub fn step_if(self, condition: bool, step: Step, message: impl Into<String>) -> Self {
        if condition {
            self.step(step, message)
        } else {
            self
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn steps(&self) -> &[TransactionStep] {
        &self.steps
    }

    /// Run the transaction. The caller must hold the client lock for the whole call.
    pub async fn execute<D>(
        &mut self,
        driver: &mut D,
        timeouts: &Timeouts,
    ) -> Result<TransactionOutcome>
    where
        D: SessionDriver + ?Sized,
    {
        debug!(
            "{}: starting transaction with {} step(s)",
            self.operation,
            self.steps.len()
        );

        if let Err(source) = bounded(timeouts.dial, driver.dial()).await {
            self.state = TransactionState::Failed(Step::Dial);
            error!("{}: dial failed: {}", self.operation, source);
            return Err(ClientError::Transport {
                step: Step::Dial,
                source,
            });
        }
        self.state = TransactionState::Dialed;

        let mut replies = Vec::with_capacity(self.steps.len());
        for TransactionStep { step, message } in &self.steps {
            self.state = TransactionState::Sending(*step);
            match bounded(timeouts.send, driver.send_raw(message)).await {
                Ok(reply) => {
                    debug!("{}: {} acknowledged", self.operation, step);
                    replies.push((*step, reply));
                }
                Err(source) => {
                    self.state = TransactionState::Failed(*step);
                    error!("{}: {} failed: {}", self.operation, step, source);
                    return Err(self.abort(driver, *step, source, timeouts).await);
                }
            }
        }

        if let Err(source) = bounded(timeouts.close, driver.close()).await {
            self.state = TransactionState::Failed(Step::Close);
            error!("{}: close failed: {}", self.operation, source);
            return Err(ClientError::Transport {
                step: Step::Close,
                source,
            });
        }
        self.state = TransactionState::Closed;

        info!(
            "{}: transaction completed ({} step(s))",
            self.operation,
            replies.len()
        );
        Ok(TransactionOutcome { replies })
    }

    /// Close the session after a failed step, folding any close failure into the error
    async fn abort<D>(
        &self,
        driver: &mut D,
        step: Step,
        source: TransportError,
        timeouts: &Timeouts,
    ) -> ClientError
    where
        D: SessionDriver + ?Sized,
    {
        match bounded(timeouts.close, driver.close()).await {
            Ok(()) => ClientError::Transport { step, source },
            Err(close) => {
                warn!(
                    "{}: closing session after failed {} also failed: {}",
                    self.operation, step, close
                );
                ClientError::Compound {
                    step,
                    source,
                    close,
                }
            }
        }
    }
}

/// Replies collected by a completed transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionOutcome {
    replies: Vec<(Step, Reply)>,
}

impl TransactionOutcome {
    /// Reply to the first message sent for `step`
    pub fn reply(&self, step: Step) -> Option<&Reply> {
        self.replies
            .iter()
            .find(|(kind, _)| *kind == step)
            .map(|(_, reply)| reply)
    }

    /// Take the reply body for `step`, empty when the step was not part of the transaction
    pub fn into_data(self, step: Step) -> String {
        self.replies
            .into_iter()
            .find(|(kind, _)| *kind == step)
            .map(|(_, reply)| reply.data)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

async fn bounded<T, F>(limit: Option<Duration>, operation: F) -> std::result::Result<T, TransportError>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        },
        None => operation.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DriverCall, FailurePoint, RecordingDriver};

    fn three_step() -> Transaction {
        Transaction::new("test")
            .step(Step::Delete, "one")
            .step(Step::Merge, "two")
            .step(Step::Commit, "three")
    }

    #[test]
    fn test_step_if_skips_false_conditions() {
        let txn = Transaction::new("test")
            .step_if(false, Step::Delete, "skipped")
            .step(Step::Merge, "kept")
            .step_if(true, Step::Commit, "kept too");

        let kinds: Vec<Step> = txn.steps().iter().map(|s| s.step).collect();
        assert_eq!(kinds, vec![Step::Merge, Step::Commit]);
        assert_eq!(txn.state(), TransactionState::Idle);
    }

    #[tokio::test]
    async fn test_successful_transaction_closes_session() {
        let mut driver = RecordingDriver::new();
        let trace = driver.trace();
        let mut txn = three_step();

        let outcome = txn.execute(&mut driver, &Timeouts::default()).await.unwrap();

        assert_eq!(outcome.len(), 3);
        assert_eq!(txn.state(), TransactionState::Closed);
        assert_eq!(
            trace.calls(),
            vec![
                DriverCall::Dial,
                DriverCall::Send("one".to_string()),
                DriverCall::Send("two".to_string()),
                DriverCall::Send("three".to_string()),
                DriverCall::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_step_short_circuits() {
        let mut driver = RecordingDriver::new();
        driver.fail_next(FailurePoint::Send(1));
        let trace = driver.trace();
        let mut txn = three_step();

        let err = txn
            .execute(&mut driver, &Timeouts::default())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::Merge));
        assert!(err.close_error().is_none());
        assert_eq!(txn.state(), TransactionState::Failed(Step::Merge));
        assert_eq!(
            trace.calls(),
            vec![
                DriverCall::Dial,
                DriverCall::Send("one".to_string()),
                DriverCall::Send("two".to_string()),
                DriverCall::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_dial_failure_does_not_close() {
        let mut driver = RecordingDriver::new();
        driver.fail_next(FailurePoint::Dial);
        let trace = driver.trace();
        let mut txn = three_step();

        let err = txn
            .execute(&mut driver, &Timeouts::default())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::Dial));
        assert_eq!(trace.calls(), vec![DriverCall::Dial]);
    }

    #[tokio::test]
    async fn test_send_timeout_is_a_step_failure() {
        let mut driver = RecordingDriver::new().with_latency(Duration::from_secs(5));
        let trace = driver.trace();
        let timeouts = Timeouts {
            send: Some(Duration::from_millis(20)),
            ..Timeouts::default()
        };
        let mut txn = three_step();

        let err = txn.execute(&mut driver, &timeouts).await.unwrap_err();

        assert_eq!(err.step(), Some(Step::Delete));
        assert!(matches!(
            err.transport_error(),
            Some(TransportError::Timeout(_))
        ));
        assert_eq!(trace.calls().last(), Some(&DriverCall::Close));
    }

    #[test]
    fn test_outcome_lookup() {
        let outcome = TransactionOutcome {
            replies: vec![
                (Step::Delete, Reply::new("deleted")),
                (Step::Merge, Reply::new("merged")),
            ],
        };

        assert_eq!(outcome.reply(Step::Merge).unwrap().data, "merged");
        assert!(outcome.reply(Step::Commit).is_none());
        assert_eq!(outcome.clone().into_data(Step::Delete), "deleted");
        assert_eq!(outcome.into_data(Step::Commit), "");
    }
}
