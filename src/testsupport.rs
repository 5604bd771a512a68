//! Shared test fixtures for stream, control-call and orchestrator tests.
//!
//! The scripted transport and recording control API stand in for the real
//! WebSocket feed and HTTP backend so tests can run on paused tokio time.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::api::{ControlAck, ControlApi};
use crate::error::{ApiError, StreamError};
use crate::stream::{Connection, Frame, Transport};
use crate::types::{Module, Scalar};

/// What one `connect` call does.
pub enum Session {
    /// Fail the connect attempt.
    Refuse,
    /// Deliver these frames, then end without a close frame.
    Frames(Vec<Frame>),
    /// Deliver frames pushed by the test until the sender is dropped.
    Live(mpsc::UnboundedReceiver<Frame>),
    /// Stay connected and silent.
    Hold,
}

/// Transport that plays back one [`Session`] per connect attempt.
///
/// Once the script runs out every further attempt is refused.
pub struct ScriptedTransport {
    sessions: Mutex<VecDeque<Session>>,
    connects: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(sessions: Vec<Session>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into()),
            connects: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// One live session plus the sender that feeds it.
    pub fn live() -> (Arc<Self>, mpsc::UnboundedSender<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(vec![Session::Live(rx)]), tx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, StreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let session = self
            .sessions
            .lock()
            .expect("session script lock")
            .pop_front()
            .unwrap_or(Session::Refuse);
        let source = match session {
            Session::Refuse => {
                return Err(StreamError::Connect("connection refused".into()));
            }
            Session::Frames(frames) => FrameSource::Fixed(frames.into()),
            Session::Live(rx) => FrameSource::Live(rx),
            Session::Hold => FrameSource::Hold,
        };
        Ok(Box::new(ScriptedConnection {
            source,
            closed: Arc::clone(&self.closed),
        }))
    }
}

enum FrameSource {
    Fixed(VecDeque<Frame>),
    Live(mpsc::UnboundedReceiver<Frame>),
    Hold,
}

struct ScriptedConnection {
    source: FrameSource,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>> {
        match &mut self.source {
            FrameSource::Fixed(frames) => frames.pop_front().map(Ok),
            FrameSource::Live(rx) => rx.recv().await.map(Ok),
            FrameSource::Hold => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Control call observed by [`RecordingControlApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    Start(Option<Scalar>),
    Approve(Module),
    Abort,
    Health,
}

/// Control API that records calls and answers from a per-call script.
#[derive(Default)]
pub struct RecordingControlApi {
    calls: Mutex<Vec<ControlCall>>,
    failures: Mutex<VecDeque<(&'static str, String)>>,
}

impl RecordingControlApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next call named `op` ("start", "approve", "abort", "health")
    /// fail with a backend message.
    pub fn fail_next(&self, op: &'static str, message: &str) {
        self.failures
            .lock()
            .expect("failure script lock")
            .push_back((op, message.to_string()));
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().expect("call log lock").clone()
    }

    fn answer(&self, op: &'static str, call: ControlCall) -> Result<ControlAck, ApiError> {
        self.calls.lock().expect("call log lock").push(call);
        let mut failures = self.failures.lock().expect("failure script lock");
        if let Some(index) = failures.iter().position(|(name, _)| *name == op) {
            let (_, message) = failures.remove(index).expect("indexed failure");
            return Err(ApiError::Status { code: 500, message });
        }
        Ok(ControlAck {
            body: json!({"ok": true, "op": op}),
        })
    }
}

#[async_trait]
impl ControlApi for RecordingControlApi {
    async fn start_run(&self, seed: Option<Scalar>) -> Result<ControlAck, ApiError> {
        self.answer("start", ControlCall::Start(seed))
    }

    async fn approve(&self, module: Module) -> Result<ControlAck, ApiError> {
        self.answer("approve", ControlCall::Approve(module))
    }

    async fn abort(&self) -> Result<ControlAck, ApiError> {
        self.answer("abort", ControlCall::Abort)
    }

    async fn health(&self) -> Result<ControlAck, ApiError> {
        self.answer("health", ControlCall::Health)
    }
}

/// JSON text frame.
pub fn json_frame(value: Value) -> Frame {
    Frame::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_transport_plays_sessions_in_order() {
        let transport = ScriptedTransport::new(vec![
            Session::Refuse,
            Session::Frames(vec![Frame::Text("a".into())]),
        ]);
        assert!(transport.connect("ws://x").await.is_err());
        let mut conn = transport.connect("ws://x").await.expect("second session");
        assert_eq!(
            conn.next_frame().await.map(|f| f.expect("frame")),
            Some(Frame::Text("a".into()))
        );
        assert!(conn.next_frame().await.is_none());
        assert!(transport.connect("ws://x").await.is_err());
        assert_eq!(transport.connect_count(), 3);
    }

    #[tokio::test]
    async fn recording_api_fails_only_scripted_call() {
        let api = RecordingControlApi::new();
        api.fail_next("approve", "no approval pending");
        assert!(api.start_run(None).await.is_ok());
        let err = api.approve(Module::Karma).await.expect_err("scripted failure");
        assert_eq!(err.operator_message(), "no approval pending");
        assert!(api.approve(Module::Karma).await.is_ok());
        assert_eq!(api.calls().len(), 3);
    }
}
