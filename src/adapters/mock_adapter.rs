//! Mock transport for testing
//!
//! This transport stands in for an instrument without requiring hardware. It
//! provides:
//! - Scripted replies per query
//! - Queued raw replies for binary block reads
//! - Controllable failure injection
//! - Call logging for test verification
//!
//! Clones share state, so a test can hand one clone to a driver and inspect
//! the call log through another.

use super::Transport;
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `write(command)`
    Write(String),
    /// `ask(command)`
    Ask(String),
    /// `read_raw()`
    ReadRaw,
    /// `write_raw(data)`
    WriteRaw(Vec<u8>),
    /// `clear()`
    Clear,
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<String, String>,
    raw_replies: VecDeque<Vec<u8>>,
    pending: Option<String>,
    call_log: Vec<Call>,
}

/// Mock transport for testing
///
/// # Example
///
/// ```
/// use rust_ivi::adapters::{MockTransport, Transport};
///
/// let mock = MockTransport::new().with_reply("*IDN?", "GW Instek,PST-3202,SN1,1.00");
/// let mut transport = mock.clone();
/// assert_eq!(transport.ask("*IDN?").unwrap(), "GW Instek,PST-3202,SN1,1.00");
/// assert_eq!(mock.asks(), vec!["*IDN?".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    should_fail_next: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply to `command`. The reply is returned every time the
    /// command is asked.
    pub fn with_reply(self, command: impl Into<String>, reply: impl Into<String>) -> Self {
        self.set_reply(command, reply);
        self
    }

    /// Script or replace the reply to `command`.
    pub fn set_reply(&self, command: impl Into<String>, reply: impl Into<String>) {
        self.state.lock().replies.insert(command.into(), reply.into());
    }

    /// Queue bytes for the next `read_raw`.
    pub fn push_raw(&self, data: impl Into<Vec<u8>>) {
        self.state.lock().raw_replies.push_back(data.into());
    }

    /// Inject a failure for the next operation
    pub fn inject_next_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<()> {
        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            Err(anyhow!("Injected failure"))
        } else {
            Ok(())
        }
    }

    /// Get the call log
    pub fn call_log(&self) -> Vec<Call> {
        self.state.lock().call_log.clone()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().call_log.len()
    }

    /// Commands passed to `write`, in order.
    pub fn writes(&self) -> Vec<String> {
        self.state
            .lock()
            .call_log
            .iter()
            .filter_map(|call| match call {
                Call::Write(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Commands passed to `ask`, in order.
    pub fn asks(&self) -> Vec<String> {
        self.state
            .lock()
            .call_log
            .iter()
            .filter_map(|call| match call {
                Call::Ask(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clear the call log
    pub fn clear_log(&self) {
        self.state.lock().call_log.clear();
    }

    fn log_call(&self, call: Call) {
        self.state.lock().call_log.push(call);
    }
}

impl Transport for MockTransport {
    fn write(&mut self, command: &str) -> Result<()> {
        self.log_call(Call::Write(command.to_string()));
        self.check_failure()?;
        debug!("mock write: {}", command);

        // a query sent with write() is answered by the next read_raw()
        let mut state = self.state.lock();
        let reply = state.replies.get(command).cloned();
        state.pending = reply;
        Ok(())
    }

    fn ask(&mut self, command: &str) -> Result<String> {
        self.log_call(Call::Ask(command.to_string()));
        self.check_failure()?;

        let reply = self
            .state
            .lock()
            .replies
            .get(command)
            .cloned()
            .ok_or_else(|| anyhow!("No scripted reply for '{}'", command))?;
        debug!("mock ask '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        self.log_call(Call::ReadRaw);
        self.check_failure()?;

        let mut state = self.state.lock();
        if let Some(data) = state.raw_replies.pop_front() {
            return Ok(data);
        }
        state
            .pending
            .take()
            .map(String::into_bytes)
            .ok_or_else(|| anyhow!("Nothing to read"))
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.log_call(Call::WriteRaw(data.to_vec()));
        self.check_failure()
    }

    fn clear(&mut self) -> Result<()> {
        self.log_call(Call::Clear);
        self.check_failure()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
