//! Fake session drivers for tests and dry runs
//!
//! [`RecordingDriver`] records every call and can inject one-shot failures.
//! [`InMemoryDevice`] keeps a candidate and a committed group store so
//! written groups can be read back.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ncgroups_core::{Reply, SessionDriver, TransportError};

/// Call observed by a [`RecordingDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Dial,
    Send(String),
    Close,
}

/// Where a [`RecordingDriver`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Dial,
    /// Zero-based index of the send within the current session
    Send(usize),
    Close,
}

/// Shared, clonable view of the calls a driver has seen
#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    calls: Arc<Mutex<Vec<DriverCall>>>,
}

impl CallTrace {
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Messages sent, in order, across all sessions
    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::Send(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: DriverCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

type Responder = Box<dyn Fn(&str) -> String + Send>;

/// Driver that records calls and answers with a configurable responder
pub struct RecordingDriver {
    trace: CallTrace,
    responder: Responder,
    failures: Vec<FailurePoint>,
    latency: Option<Duration>,
    connected: bool,
    sends_in_session: usize,
}

impl RecordingDriver {
    /// Driver that answers every message with `<ok/>`
    pub fn new() -> Self {
        Self {
            trace: CallTrace::default(),
            responder: Box::new(|_| "<ok/>".to_string()),
            failures: Vec::new(),
            latency: None,
            connected: false,
            sends_in_session: 0,
        }
    }

    /// Answer each message with `responder(message)`
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Sleep before answering each message
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail once at `point`
    pub fn fail_next(&mut self, point: FailurePoint) {
        self.failures.push(point);
    }

    pub fn trace(&self) -> CallTrace {
        self.trace.clone()
    }

    fn take_failure(&mut self, point: FailurePoint) -> bool {
        match self.failures.iter().position(|p| *p == point) {
            Some(index) => {
                self.failures.remove(index);
                true
            }
            None => false,
        }
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordingDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDriver")
            .field("failures", &self.failures)
            .field("latency", &self.latency)
            .field("connected", &self.connected)
            .finish()
    }
}

#[async_trait]
impl SessionDriver for RecordingDriver {
    async fn dial(&mut self) -> Result<(), TransportError> {
        self.trace.record(DriverCall::Dial);
        if self.take_failure(FailurePoint::Dial) {
            return Err(TransportError::Connect("injected dial failure".to_string()));
        }
        self.connected = true;
        self.sends_in_session = 0;
        Ok(())
    }

    async fn send_raw(&mut self, message: &str) -> Result<Reply, TransportError> {
        self.trace.record(DriverCall::Send(message.to_string()));
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let index = self.sends_in_session;
        self.sends_in_session += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.take_failure(FailurePoint::Send(index)) {
            return Err(TransportError::Rejected(format!(
                "injected failure on send {}",
                index
            )));
        }

        Ok(Reply::new((self.responder)(message)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.trace.record(DriverCall::Close);
        self.connected = false;
        if self.take_failure(FailurePoint::Close) {
            return Err(TransportError::ClosedByPeer);
        }
        Ok(())
    }
}

/// Idealized device that stores merged groups and echoes them back.
///
/// Merges land in the candidate store; `<commit/>` copies candidate to
/// committed; reads are served from the committed store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDevice {
    state: Arc<Mutex<DeviceState>>,
    connected: bool,
}

#[derive(Debug, Clone, Default)]
struct DeviceState {
    candidate: HashMap<String, String>,
    committed: HashMap<String, String>,
}

impl InMemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed payload for `group`
    pub fn committed(&self, group: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.committed.get(group).cloned())
    }

    /// Candidate payload for `group`
    pub fn candidate(&self, group: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.candidate.get(group).cloned())
    }

    fn handle(&self, message: &str) -> Result<String, TransportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TransportError::MalformedReply("device state poisoned".to_string()))?;
        let trimmed = message.trim_start();

        if trimmed.starts_with("<edit-config>") {
            let group = first_element_text(message, "name")
                .ok_or_else(|| TransportError::Rejected("delete without group name".to_string()))?;
            state.candidate.remove(&group);
            Ok("<ok/>".to_string())
        } else if trimmed.starts_with("<load-configuration") {
            let payload = strip_load_envelope(message)
                .ok_or_else(|| TransportError::Rejected("malformed load-configuration".to_string()))?;
            let group = first_element_text(&payload, "name")
                .ok_or_else(|| TransportError::Rejected("payload names no group".to_string()))?;
            state.candidate.insert(group, payload);
            Ok("<load-configuration-results><ok/></load-configuration-results>".to_string())
        } else if trimmed.starts_with("<commit/>") {
            state.committed = state.candidate.clone();
            Ok("<commit-results><routing-engine><name>re0</name></routing-engine></commit-results>"
                .to_string())
        } else if trimmed.starts_with("<get-configuration") {
            let group = first_element_text(message, "name")
                .ok_or_else(|| TransportError::Rejected("read without group name".to_string()))?;
            Ok(state
                .committed
                .get(&group)
                .cloned()
                .unwrap_or_else(|| "<configuration/>".to_string()))
        } else {
            Err(TransportError::Rejected(format!(
                "unsupported request: {}",
                trimmed.lines().next().unwrap_or_default()
            )))
        }
    }
}

#[async_trait]
impl SessionDriver for InMemoryDevice {
    async fn dial(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn send_raw(&mut self, message: &str) -> Result<Reply, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.handle(message).map(Reply::new)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }
}

fn first_element_text(xml: &str, element: &str) -> Option<String> {
    let open = format!("<{}>", element);
    let close = format!("</{}>", element);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim().to_string())
}

fn strip_load_envelope(message: &str) -> Option<String> {
    let start = message.find('>')? + 1;
    let end = message.rfind("</load-configuration>")?;
    (start <= end).then(|| message[start..end].trim().to_string())
}
