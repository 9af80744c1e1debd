//! NETCONF 1.0 end-of-message framing and `<rpc-reply>` unwrapping

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use ncgroups_core::TransportError;

/// End-of-message marker
pub const DELIMITER: &str = "]]>]]>";

pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Client hello advertising base:1.0 only, which keeps the device on
/// end-of-message framing
pub const CLIENT_HELLO: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\n",
    "  <capabilities>\n",
    "    <capability>urn:ietf:params:netconf:base:1.0</capability>\n",
    "  </capabilities>\n",
    "</hello>\n",
    "]]>]]>"
);

/// Accumulates channel data and yields complete messages
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Next complete message with the delimiter removed
    pub fn next_message(&mut self) -> Option<String> {
        let marker = DELIMITER.as_bytes();
        let end = self
            .pending
            .windows(marker.len())
            .position(|window| window == marker)?;

        let message = String::from_utf8_lossy(&self.pending[..end]).into_owned();
        self.pending.drain(..end + marker.len());
        Some(message)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.iter().all(u8::is_ascii_whitespace)
    }
}

/// Wrap `body` in an `<rpc>` element and terminate it
pub fn wrap_rpc(message_id: u64, body: &str) -> String {
    format!(
        "<rpc message-id=\"{}\" xmlns=\"{}\">\n{}\n</rpc>\n{}",
        message_id,
        NETCONF_NS,
        body.trim(),
        DELIMITER
    )
}

/// Body of the `<rpc-reply>` in `raw`.
///
/// Any `<rpc-error>` whose severity is not `warning` turns the reply into
/// [`TransportError::Rejected`]; warnings are logged and the body returned.
pub fn parse_rpc_reply(raw: &str) -> Result<String, TransportError> {
    let mut reader = Reader::from_str(raw);
    let malformed = |e: quick_xml::Error| TransportError::MalformedReply(e.to_string());

    // Locate the reply element.
    let body_start = loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.local_name().as_ref() == b"rpc-reply" => {
                break reader.buffer_position();
            }
            Event::Empty(e) if e.local_name().as_ref() == b"rpc-reply" => {
                return Ok(String::new());
            }
            Event::Eof => {
                return Err(TransportError::MalformedReply(
                    "no rpc-reply element".to_string(),
                ))
            }
            _ => {}
        }
    };

    let mut depth = 0usize;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut errors: Vec<RpcError> = Vec::new();
    let mut current: Option<RpcError> = None;

    let body_end = loop {
        let before = reader.buffer_position();
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"rpc-error" {
                    current = Some(RpcError::default());
                }
                path.push(name);
                depth += 1;
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"rpc-error" {
                    errors.push(RpcError::default());
                }
            }
            Event::End(e) => {
                if depth == 0 {
                    if e.local_name().as_ref() != b"rpc-reply" {
                        return Err(TransportError::MalformedReply(
                            "unbalanced rpc-reply".to_string(),
                        ));
                    }
                    break before;
                }
                depth -= 1;
                if path.pop().as_deref() == Some(b"rpc-error".as_slice()) {
                    errors.extend(current.take());
                }
            }
            Event::Text(t) => {
                if let Some(error) = current.as_mut() {
                    let text = t.unescape().map_err(malformed)?;
                    error.record(path.last().map(Vec::as_slice), text.trim());
                }
            }
            Event::Eof => {
                return Err(TransportError::MalformedReply(
                    "unterminated rpc-reply".to_string(),
                ))
            }
            _ => {}
        }
    };

    let mut rejected = Vec::new();
    for error in errors {
        if error.severity == "warning" {
            warn!("device warning: {}", error.describe());
        } else {
            rejected.push(error.describe());
        }
    }
    if !rejected.is_empty() {
        return Err(TransportError::Rejected(rejected.join("; ")));
    }

    Ok(raw[body_start..body_end].trim().to_string())
}

#[derive(Debug, Default)]
struct RpcError {
    severity: String,
    message: String,
    path: String,
}

impl RpcError {
    fn record(&mut self, element: Option<&[u8]>, text: &str) {
        match element {
            Some(b"error-severity") => self.severity = text.to_string(),
            Some(b"error-message") => self.message = text.to_string(),
            Some(b"error-path") => self.path = text.to_string(),
            _ => {}
        }
    }

    fn describe(&self) -> String {
        let message = if self.message.is_empty() {
            "unspecified error"
        } else {
            &self.message
        };
        if self.path.is_empty() {
            message.to_string()
        } else {
            format!("{} (at {})", message, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_splits_messages() {
        let mut buffer = FrameBuffer::new();
        buffer.push(b"<hello/>]]>");
        assert_eq!(buffer.next_message(), None);

        buffer.push(b"]]><rpc-reply>");
        assert_eq!(buffer.next_message().as_deref(), Some("<hello/>"));
        assert_eq!(buffer.next_message(), None);
        assert!(!buffer.is_empty());

        buffer.push(b"<ok/></rpc-reply>]]>]]>\n");
        assert_eq!(
            buffer.next_message().as_deref(),
            Some("<rpc-reply><ok/></rpc-reply>")
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_wrap_rpc() {
        let wrapped = wrap_rpc(7, "<commit/>");
        assert!(wrapped.starts_with("<rpc message-id=\"7\""));
        assert!(wrapped.contains(NETCONF_NS));
        assert!(wrapped.contains("<commit/>"));
        assert!(wrapped.ends_with("</rpc>\n]]>]]>"));
    }

    #[test]
    fn test_parse_reply_body() {
        let raw = r#"<?xml version="1.0"?>
<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="3">
<load-configuration-results>
<ok/>
</load-configuration-results>
</rpc-reply>"#;

        let body = parse_rpc_reply(raw).unwrap();
        assert!(body.starts_with("<load-configuration-results>"));
        assert!(body.ends_with("</load-configuration-results>"));
    }

    #[test]
    fn test_parse_empty_reply() {
        assert_eq!(parse_rpc_reply("<rpc-reply/>").unwrap(), "");
        assert_eq!(parse_rpc_reply("<rpc-reply></rpc-reply>").unwrap(), "");
    }

    #[test]
    fn test_parse_prefixed_reply() {
        let raw = r#"<nc:rpc-reply xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><nc:ok/></nc:rpc-reply>"#;
        assert_eq!(parse_rpc_reply(raw).unwrap(), "<nc:ok/>");
    }

    #[test]
    fn test_rpc_error_is_rejected() {
        let raw = r#"<rpc-reply>
<load-configuration-results>
<rpc-error>
<error-severity>error</error-severity>
<error-path>[edit groups]</error-path>
<error-message>syntax error</error-message>
</rpc-error>
</load-configuration-results>
</rpc-reply>"#;

        match parse_rpc_reply(raw) {
            Err(TransportError::Rejected(message)) => {
                assert_eq!(message, "syntax error (at [edit groups])");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_rpc_warning_is_not_rejected() {
        let raw = r#"<rpc-reply>
<rpc-error>
<error-severity>warning</error-severity>
<error-message>statement not found</error-message>
</rpc-error>
<ok/>
</rpc-reply>"#;

        let body = parse_rpc_reply(raw).unwrap();
        assert!(body.contains("<ok/>"));
    }

    #[test]
    fn test_missing_reply_is_malformed() {
        assert!(matches!(
            parse_rpc_reply("<hello/>"),
            Err(TransportError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_rpc_reply("<rpc-reply><ok/>"),
            Err(TransportError::MalformedReply(_))
        ));
    }
}
