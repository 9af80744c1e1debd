//! ncgroups core
//!
//! Session driver contract, protocol message templates and error types shared
//! by the transaction client and the transport drivers.

pub mod driver;
pub mod error;
pub mod protocol;

pub use driver::{Reply, SessionDriver};
pub use error::{ClientError, Step, TransportError};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
