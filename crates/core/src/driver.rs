//! Session driver contract

use async_trait::async_trait;

use crate::error::TransportError;

/// Reply to one protocol message: the body of the device's reply wrapper
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub data: String,
}

impl Reply {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Transport primitives consumed by the transaction client.
///
/// A driver is owned by exactly one client and is only ever driven while that
/// client's lock is held, hence `&mut self` everywhere.
#[async_trait]
pub trait SessionDriver: Send {
    /// Establish the session. May be called again after a failed attempt.
    async fn dial(&mut self) -> Result<(), TransportError>;

    /// Send one complete message and wait for the matching reply.
    async fn send_raw(&mut self, message: &str) -> Result<Reply, TransportError>;

    /// Tear the session down. Must succeed as a no-op when nothing is open,
    /// and must be callable after a failed send.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl<D: SessionDriver + ?Sized> SessionDriver for Box<D> {
    async fn dial(&mut self) -> Result<(), TransportError> {
        (**self).dial().await
    }

    async fn send_raw(&mut self, message: &str) -> Result<Reply, TransportError> {
        (**self).send_raw(message).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
