//! ncgroups client
//!
//! Serialized configuration-group transactions: every operation dials the
//! device, sends its messages in order and closes the session while holding
//! the client lock, so concurrent callers never interleave.

pub mod client;
pub mod codec;
pub mod config_client;
pub mod mock;
pub mod reply;
pub mod transaction;


pub use client::TransactionClient;
pub use config_client::{ConfigClient, ConfigClientExt};
pub use ncgroups_core::{protocol, ClientError, Reply, Result, SessionDriver, Step, TransportError};
pub use transaction::{Timeouts, Transaction, TransactionOutcome, TransactionState};
