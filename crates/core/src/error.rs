//! Error types for configuration-group operations

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Protocol step a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Establishing the session
    Dial,
    /// Removing a group and its apply-groups reference
    Delete,
    /// Loading a payload with `action=merge`
    Merge,
    /// Committing the candidate configuration
    Commit,
    /// Reading a group back from the committed database
    Read,
    /// Caller-supplied message sent without wrapping
    Raw,
    /// Tearing the session down
    Close,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Dial => "dial",
            Step::Delete => "delete",
            Step::Merge => "merge",
            Step::Commit => "commit",
            Step::Read => "read",
            Step::Raw => "raw send",
            Step::Close => "close",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised at the session driver boundary
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("authentication rejected for user {user}")]
    Authentication { user: String },

    #[error("session not established")]
    NotConnected,

    #[error("session closed by peer")]
    ClosedByPeer,

    #[error("SSH error: {0}")]
    Ssh(String),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// The device answered with an `<rpc-error>` of severity `error`
    #[error("device rejected request: {0}")]
    Rejected(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type returned by client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// A step failed and the session (if one was open) closed cleanly
    #[error("{step} failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },

    /// A step failed and closing the session while unwinding failed too
    #[error("{step} failed: {source}; closing the session also failed: {close}")]
    Compound {
        step: Step,
        #[source]
        source: TransportError,
        close: TransportError,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("XML decode failed: {0}")]
    Decode(#[source] quick_xml::DeError),

    #[error("XML encode failed: {0}")]
    Encode(#[source] quick_xml::DeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key load error: {0}")]
    KeyLoad(String),

    #[error("client has been closed")]
    Closed,
}

impl ClientError {
    /// Step the failure happened at, for transport-level failures
    pub fn step(&self) -> Option<Step> {
        match self {
            ClientError::Transport { step, .. } | ClientError::Compound { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// Driver error that caused a transport-level failure
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            ClientError::Transport { source, .. } | ClientError::Compound { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Close failure encountered while unwinding, if any
    pub fn close_error(&self) -> Option<&TransportError> {
        match self {
            ClientError::Compound { close, .. } => Some(close),
            _ => None,
        }
    }

    /// Whether the device itself refused the request
    pub fn is_rejected(&self) -> bool {
        matches!(self.transport_error(), Some(TransportError::Rejected(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_error_mentions_both_failures() {
        let err = ClientError::Compound {
            step: Step::Merge,
            source: TransportError::Rejected("syntax error".to_string()),
            close: TransportError::ClosedByPeer,
        };

        let message = err.to_string();
        assert!(message.contains("merge failed"));
        assert!(message.contains("syntax error"));
        assert!(message.contains("session closed by peer"));
        assert_eq!(err.step(), Some(Step::Merge));
        assert!(err.close_error().is_some());
        assert!(err.is_rejected());
    }

    #[test]
    fn test_transport_error_has_no_close_error() {
        let err = ClientError::Transport {
            step: Step::Dial,
            source: TransportError::Connect("refused".to_string()),
        };

        assert_eq!(err.to_string(), "dial failed: connection failed: refused");
        assert!(err.close_error().is_none());
        assert!(!err.is_rejected());
        assert!(ClientError::Closed.step().is_none());
    }
}
