//! Outbound control calls to the simulation backend.
//!
//! The orchestrator talks to the backend through the [`ControlApi`] trait so
//! tests can substitute a recording implementation. Calls are fire-once: the
//! core never retries them; failures surface as an operator message.

mod client;

pub use client::{join_url, HttpControlApi};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{Module, Scalar};

/// Successful control-call reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlAck {
    pub body: Value,
}

impl ControlAck {
    /// Parse a reply body; non-JSON text is kept as a JSON string.
    pub fn from_body(text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text)
            .unwrap_or_else(|_| Value::String(text.trim().to_string()));
        Self { body }
    }

    /// Compact text for log lines.
    pub fn summary(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Start/approve/abort/health calls against the backend.
#[async_trait]
pub trait ControlApi: Send + Sync {
    async fn start_run(&self, seed: Option<Scalar>) -> Result<ControlAck, ApiError>;
    async fn approve(&self, module: Module) -> Result<ControlAck, ApiError>;
    async fn abort(&self) -> Result<ControlAck, ApiError>;
    async fn health(&self) -> Result<ControlAck, ApiError>;
}
