//! NETCONF 1.0 message exchange over any byte stream

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use ncgroups_core::protocol::CLOSE_SESSION;
use ncgroups_core::{Reply, TransportError};

use crate::framing::{self, FrameBuffer, CLIENT_HELLO};

const READ_CHUNK: usize = 8 * 1024;

/// An open NETCONF session: hello exchanged, `<rpc>` message ids allocated
/// in order starting at 1
pub struct NetconfSession<S> {
    stream: S,
    buffer: FrameBuffer,
    next_message_id: u64,
}

impl<S> NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wait for the device hello, then answer with ours
    pub async fn start(stream: S) -> Result<Self, TransportError> {
        let mut session = Self {
            stream,
            buffer: FrameBuffer::new(),
            next_message_id: 1,
        };

        let hello = session.read_message().await?;
        if !hello.contains("hello") {
            return Err(TransportError::MalformedReply(
                "expected a hello message from the device".to_string(),
            ));
        }
        session.write(CLIENT_HELLO).await?;
        Ok(session)
    }

    /// Send `body` as the next `<rpc>` and unwrap its reply
    pub async fn request(&mut self, body: &str) -> Result<Reply, TransportError> {
        let message_id = self.allocate_id();
        self.write(&framing::wrap_rpc(message_id, body)).await?;
        let raw = self.read_message().await?;
        framing::parse_rpc_reply(&raw).map(Reply::new)
    }

    /// Send `<close-session/>` and shut the stream down. A missing reply is
    /// only logged; the session is over either way.
    pub async fn close_session(mut self) {
        let message_id = self.allocate_id();
        let goodbye = framing::wrap_rpc(message_id, CLOSE_SESSION);
        match self.write(&goodbye).await {
            Ok(()) => {
                if let Err(e) = self.read_message().await {
                    debug!("no close-session reply: {}", e);
                }
            }
            Err(e) => debug!("could not send close-session: {}", e),
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("stream shutdown failed: {}", e);
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    async fn write(&mut self, message: &str) -> Result<(), TransportError> {
        self.stream.write_all(message.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read until one complete framed message is buffered
    async fn read_message(&mut self) -> Result<String, TransportError> {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            if let Some(message) = self.buffer.next_message() {
                return Ok(message);
            }
            let read = self.stream.read(&mut chunk).await?;
            if read == 0 {
                return Err(TransportError::ClosedByPeer);
            }
            self.buffer.push(&chunk[..read]);
        }
    }
}
