//! Reconnecting client for the backend event stream.
//!
//! [`spawn_stream`] owns one logical connection. It reports lifecycle changes
//! and demultiplexed payloads through a callback, reconnects with exponential
//! backoff after every close or error, and stops only when the returned
//! [`StreamHandle`] is closed or dropped.

mod backoff;
mod demux;
mod transport;
mod url;

pub use backoff::{Backoff, BackoffPolicy};
pub use demux::{demux, Inbound};
pub use transport::{Connection, Frame, Transport, WsTransport, ABNORMAL_CLOSE, NO_STATUS_CLOSE};
pub use url::resolve_stream_url;

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::StreamError;

/// Everything the stream reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connecting { attempt: u32 },
    Open,
    Closed { code: u16, reason: String, clean: bool },
    Error { message: String },
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// Whole decoded payload of a structured frame.
    Message(Value),
    Log(String),
    Event(Value),
}

impl From<Inbound> for StreamEvent {
    fn from(inbound: Inbound) -> Self {
        match inbound {
            Inbound::Message(value) => Self::Message(value),
            Inbound::Log(text) => Self::Log(text),
            Inbound::Event(value) => Self::Event(value),
        }
    }
}

/// Owner handle; closing (or dropping) it ends the retry loop for good.
#[derive(Debug)]
pub struct StreamHandle {
    url: Option<String>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Stop reconnecting and close the live connection, if any.
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Start the stream loop. `url` of `None` reports one error and stops.
pub fn spawn_stream<F>(
    transport: Arc<dyn Transport>,
    url: Option<String>,
    policy: BackoffPolicy,
    on_event: F,
) -> StreamHandle
where
    F: FnMut(StreamEvent) + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_stream(
        transport,
        url.clone(),
        Backoff::new(policy),
        on_event,
        shutdown_rx,
    ));
    StreamHandle {
        url,
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

enum SessionEnd {
    Shutdown,
    Closed { code: u16, reason: String, clean: bool },
    Failed(StreamError),
}

async fn run_stream<F>(
    transport: Arc<dyn Transport>,
    url: Option<String>,
    mut backoff: Backoff,
    mut on_event: F,
    mut shutdown: watch::Receiver<bool>,
) where
    F: FnMut(StreamEvent) + Send + 'static,
{
    let Some(url) = url else {
        let err = StreamError::NotConfigured(
            "set backend.ws_url or backend.api_base_url (TAYKA_WS_URL / TAYKA_API_URL)".into(),
        );
        on_event(StreamEvent::Error {
            message: err.to_string(),
        });
        return;
    };

    loop {
        if *shutdown.borrow() {
            return;
        }
        on_event(StreamEvent::Connecting {
            attempt: backoff.attempt(),
        });
        tracing::debug!(url = %url, attempt = backoff.attempt(), "connecting stream");

        let connected = tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            result = transport.connect(&url) => result,
        };

        let end = match connected {
            Ok(mut conn) => {
                backoff.reset();
                tracing::info!(url = %url, "stream connected");
                on_event(StreamEvent::Open);
                let end = pump_frames(conn.as_mut(), &mut on_event, &mut shutdown).await;
                if matches!(end, SessionEnd::Shutdown) {
                    conn.close().await;
                }
                end
            }
            Err(err) => SessionEnd::Failed(err),
        };

        match end {
            SessionEnd::Shutdown => return,
            SessionEnd::Closed {
                code,
                reason,
                clean,
            } => on_event(StreamEvent::Closed {
                code,
                reason,
                clean,
            }),
            SessionEnd::Failed(err) => on_event(StreamEvent::Error {
                message: err.to_string(),
            }),
        }

        let delay = backoff.next_delay();
        tracing::warn!(
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "stream down, reconnect scheduled"
        );
        on_event(StreamEvent::Reconnecting {
            attempt: backoff.attempt(),
            delay_ms: delay.as_millis() as u64,
        });
        tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn pump_frames<F>(
    conn: &mut dyn Connection,
    on_event: &mut F,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    F: FnMut(StreamEvent),
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            frame = conn.next_frame() => frame,
        };
        match frame {
            Some(Ok(Frame::Text(text))) => {
                for inbound in demux(&text) {
                    on_event(inbound.into());
                }
            }
            Some(Ok(Frame::Close { code, reason })) => {
                return SessionEnd::Closed {
                    code,
                    reason,
                    clean: true,
                }
            }
            Some(Err(err)) => return SessionEnd::Failed(err),
            None => {
                return SessionEnd::Closed {
                    code: ABNORMAL_CLOSE,
                    reason: String::new(),
                    clean: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{ScriptedTransport, Session};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn collect_into(tx: mpsc::UnboundedSender<StreamEvent>) -> impl FnMut(StreamEvent) + Send {
        move |event| {
            let _ = tx.send(event);
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("stream event timeout")
            .expect("stream channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_demultiplexed_in_order() {
        let transport = ScriptedTransport::new(vec![Session::Frames(vec![
            Frame::Text(r#"{"log":"hello","event":{"type":"SIM_STARTED"}}"#.into()),
            Frame::Text("plain line".into()),
        ])]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_stream(
            transport.clone(),
            Some("ws://sim.test/ws".into()),
            BackoffPolicy::default(),
            collect_into(tx),
        );

        assert_eq!(next(&mut rx).await, StreamEvent::Connecting { attempt: 0 });
        assert_eq!(next(&mut rx).await, StreamEvent::Open);
        assert!(matches!(next(&mut rx).await, StreamEvent::Message(_)));
        assert_eq!(next(&mut rx).await, StreamEvent::Log("hello".into()));
        assert!(matches!(next(&mut rx).await, StreamEvent::Event(_)));
        assert_eq!(next(&mut rx).await, StreamEvent::Log("plain line".into()));
        assert_eq!(
            next(&mut rx).await,
            StreamEvent::Closed {
                code: ABNORMAL_CLOSE,
                reason: String::new(),
                clean: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_delays_back_off_and_reset_after_open() {
        let transport = ScriptedTransport::new(vec![
            Session::Refuse,
            Session::Refuse,
            Session::Refuse,
            Session::Frames(vec![Frame::Close {
                code: 1000,
                reason: "bye".into(),
            }]),
            Session::Refuse,
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_stream(
            transport.clone(),
            Some("ws://sim.test/ws".into()),
            BackoffPolicy::default(),
            collect_into(tx),
        );

        let mut delays = Vec::new();
        let mut closes = Vec::new();
        while delays.len() < 5 {
            match next(&mut rx).await {
                StreamEvent::Reconnecting { delay_ms, .. } => delays.push(delay_ms),
                StreamEvent::Closed { code, clean, .. } => closes.push((code, clean)),
                _ => {}
            }
        }
        assert_eq!(delays, vec![1000, 2000, 4000, 1000, 2000]);
        assert_eq!(closes, vec![(1000, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_retry_loop() {
        let transport = ScriptedTransport::new(vec![Session::Refuse]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_stream(
            transport.clone(),
            Some("ws://sim.test/ws".into()),
            BackoffPolicy::default(),
            collect_into(tx),
        );
        loop {
            if matches!(next(&mut rx).await, StreamEvent::Reconnecting { .. }) {
                break;
            }
        }
        handle.close().await;
        let connects = transport.connect_count();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.connect_count(), connects);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_while_connected_closes_connection() {
        let transport = ScriptedTransport::new(vec![Session::Hold]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_stream(
            transport.clone(),
            Some("ws://sim.test/ws".into()),
            BackoffPolicy::default(),
            collect_into(tx),
        );
        assert!(matches!(next(&mut rx).await, StreamEvent::Connecting { .. }));
        assert_eq!(next(&mut rx).await, StreamEvent::Open);
        handle.close().await;
        assert_eq!(transport.closed_count(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn missing_url_reports_once_without_retry() {
        let transport = ScriptedTransport::new(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_stream(transport.clone(), None, BackoffPolicy::default(), collect_into(tx));
        let event = next(&mut rx).await;
        assert!(
            matches!(&event, StreamEvent::Error { message } if message.contains("not configured")),
            "got: {event:?}"
        );
        assert!(rx.recv().await.is_none());
        assert_eq!(transport.connect_count(), 0);
    }
}
