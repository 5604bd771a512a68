//! Stream transport seam and its WebSocket implementation.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::StreamError;

/// Close code reported when the peer vanished without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;
/// Close code reported for a close frame without a status.
pub const NO_STATUS_CLOSE: u16 = 1005;

/// Frame delivered to the stream loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Opens connections to the backend event feed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, StreamError>;
}

/// One live connection.
#[async_trait]
pub trait Connection: Send {
    /// Next frame; `None` when the connection ended without a close frame.
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>>;

    /// Caller-initiated close.
    async fn close(&mut self);
}

/// `tokio-tungstenite` transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, StreamError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(err) => return Some(Err(err.into())),
            };
            match message {
                WsMessage::Text(text) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                WsMessage::Binary(bytes) => {
                    return Some(Ok(Frame::Text(
                        String::from_utf8_lossy(&bytes).into_owned(),
                    )))
                }
                WsMessage::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                        None => (NO_STATUS_CLOSE, String::new()),
                    };
                    return Some(Ok(Frame::Close { code, reason }));
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
