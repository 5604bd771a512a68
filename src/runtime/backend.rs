//! Backend driver: control calls over HTTP, progress over the event stream.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::driver::{spawn_control_call, ControlOp, ControlReply, DriverInput, RunDriver};
use super::schema::{ConnectionState, EventRecord, RecordStatus};
use super::state::{ConsoleState, RECORD_KIND};
use crate::api::ControlApi;
use crate::stream::{
    spawn_stream, BackoffPolicy, StreamEvent, StreamHandle, Transport, ABNORMAL_CLOSE,
};
use crate::telemetry::{decode_recommendation, parse_line};
use crate::types::{Module, Outcome, Scalar};

/// Fail-silent reason recorded when the backend reports an approval timeout.
pub(crate) const BACKEND_TIMEOUT_REASON: &str = "approval timeout (fail-silent)";

const APPROVAL_REQUEST_HINTS: &[&str] = &["waiting for approval", "onay", "approve"];
const APPROVAL_TIMEOUT_HINTS: &[&str] = &["timeout", "zaman aşımı", "fail-silent"];

/// How a resolved backend event ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminal {
    Success,
    Abort,
    Failure,
}

pub(crate) struct BackendDriver {
    api: Arc<dyn ControlApi>,
    transport: Arc<dyn Transport>,
    stream_url: Option<String>,
    backoff: BackoffPolicy,
    stream: Option<StreamHandle>,
}

impl BackendDriver {
    pub(crate) fn new(
        api: Arc<dyn ControlApi>,
        transport: Arc<dyn Transport>,
        stream_url: Option<String>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            api,
            transport,
            stream_url,
            backoff,
            stream: None,
        }
    }

    fn on_stream(&mut self, state: &mut ConsoleState, event: StreamEvent) {
        match event {
            StreamEvent::Connecting { attempt } => {
                if attempt == 0 {
                    state.set_connection(ConnectionState::Connecting);
                }
                state.log("Connecting to backend stream...");
            }
            StreamEvent::Open => {
                state.set_connection(ConnectionState::Connected);
                state.log("Stream connected");
            }
            StreamEvent::Closed {
                code,
                reason,
                clean,
            } => {
                state.set_connection(ConnectionState::Disconnected);
                state.log(close_diagnostic(code, &reason, clean));
                if code == ABNORMAL_CLOSE {
                    state.warn(
                        "stream closed unexpectedly (code=1006); the backend or its tunnel may be down, run a health check",
                    );
                }
            }
            StreamEvent::Error { message } => {
                state.set_connection(ConnectionState::Error);
                state.log(format!("Stream error: {message}"));
                state.warn(format!("stream error: {message}"));
            }
            StreamEvent::Reconnecting { attempt, delay_ms } => {
                state.set_connection(ConnectionState::Reconnecting { attempt, delay_ms });
                state.log(format!(
                    "Stream disconnected. Reconnecting in {}s (attempt {attempt})",
                    (delay_ms as f64 / 1000.0).round() as u64
                ));
            }
            StreamEvent::Message(payload) => {
                if let Some(recommendation) = decode_recommendation(&payload) {
                    state.set_recommendation(recommendation);
                }
            }
            StreamEvent::Log(text) => self.on_log_line(state, text),
            StreamEvent::Event(event) => self.on_event(state, &event),
        }
    }

    fn on_log_line(&mut self, state: &mut ConsoleState, text: String) {
        state.log_and_output(text.clone());
        if let Some(patch) = parse_line(&text) {
            state.apply_patch(patch);
        }
        let lower = text.to_lowercase();
        if contains_any(&lower, APPROVAL_REQUEST_HINTS) {
            state.request_approval();
        }
        if contains_any(&lower, APPROVAL_TIMEOUT_HINTS) {
            state.expire_approval(BACKEND_TIMEOUT_REASON);
        }
    }

    fn on_event(&mut self, state: &mut ConsoleState, event: &Value) {
        let Some(obj) = event.as_object() else {
            return;
        };
        let kind = obj
            .get("type")
            .or_else(|| obj.get("kind"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .unwrap_or("Sim")
            .to_string();
        let terminal = classify_terminal(&kind);
        tracing::debug!(kind = %kind, terminal = ?terminal, "backend event");

        if is_started(&kind) && !state.is_active() {
            // Runs started outside this console are tracked too.
            if state.begin_run(None).is_some() {
                state.log(format!("Run opened by backend event {kind}"));
            }
        }

        state.capture_telemetry(
            obj.get("ammo").and_then(Scalar::from_json),
            obj.get("energy").and_then(Scalar::from_json),
        );

        let record = self.shape_record(state, obj, &kind, terminal);
        if let Some(record) = record {
            state.set_record(record);
        }

        let detail = event_detail(obj);
        state.output(match &detail {
            Some(detail) => format!("{kind}: {detail}"),
            None => kind.clone(),
        });

        match terminal {
            Some(Terminal::Success) => {
                state.finish_run(Outcome::Success, None);
            }
            Some(Terminal::Abort) => {
                state.finish_run(Outcome::Failure, Some("Abort"));
            }
            Some(Terminal::Failure) => {
                state.finish_run(Outcome::Failure, detail.as_deref());
            }
            None => {}
        }
    }

    fn shape_record(
        &self,
        state: &ConsoleState,
        obj: &serde_json::Map<String, Value>,
        kind: &str,
        terminal: Option<Terminal>,
    ) -> Option<EventRecord> {
        let base = match state.record() {
            Some(record) => record.clone(),
            None => {
                let run = state.active_run()?;
                EventRecord {
                    id: run.id,
                    time: run.started_at,
                    kind: RECORD_KIND.to_string(),
                    level: "Medium".to_string(),
                    status: RecordStatus::Detected,
                    source: "Backend".to_string(),
                }
            }
        };
        let level = string_field(obj, &["level", "severity"]).unwrap_or_else(|| "Medium".into());
        let status = match string_field(obj, &["status", "state"]) {
            Some(label) => normalize_record_status(&label),
            None => infer_record_status(kind, terminal),
        };
        let approved = state
            .active_run()
            .and_then(|run| run.approved_module)
            .map(|module| module.as_str().to_string());
        let source = approved
            .or_else(|| string_field(obj, &["source", "origin"]))
            .unwrap_or_else(|| "Backend".into());
        Some(EventRecord {
            level,
            status,
            source,
            ..base
        })
    }

    fn on_control_reply(&mut self, state: &mut ConsoleState, reply: ControlReply) {
        let ControlReply { op, run_id, result } = reply;
        match (op, result) {
            (ControlOp::Start, Ok(ack)) => {
                state.log(format!("Sim start: {}", ack.summary()));
                state.output("Sim start requested");
            }
            (ControlOp::Start, Err(message)) => {
                state.log_and_output(format!("Sim start FAILED: {message}"));
                state.error(format!("start failed: {message}"));
                if run_id.is_some() && state.active_id() == run_id {
                    state.fail_run(&message);
                }
            }
            (ControlOp::Approve(module), Ok(ack)) => {
                let wire = module.wire_name();
                state.log(format!("Sim approve ({wire}): {}", ack.summary()));
                state.output(format!("Approve sent ({wire})"));
            }
            (ControlOp::Approve(_), Err(message)) => {
                state.log_and_output(format!("Sim approve FAILED: {message}"));
                state.error(format!("approve failed: {message}"));
            }
            (ControlOp::Abort, Ok(ack)) => {
                state.log(format!("Sim abort: {}", ack.summary()));
                state.output("Abort sent");
            }
            (ControlOp::Abort, Err(message)) => {
                state.log_and_output(format!("Sim abort FAILED: {message}"));
                state.error(format!("abort failed: {message}"));
            }
            (ControlOp::Health, Ok(ack)) => {
                state.log_and_output(format!("Health OK: {}", ack.summary()));
            }
            (ControlOp::Health, Err(message)) => {
                state.log_and_output(format!("Health FAILED: {message}"));
                state.warn(format!("backend health check failed: {message}"));
            }
        }
    }
}

#[async_trait]
impl RunDriver for BackendDriver {
    fn attach(&mut self, state: &mut ConsoleState) {
        let inputs = state.inputs.clone();
        let handle = spawn_stream(
            Arc::clone(&self.transport),
            self.stream_url.clone(),
            self.backoff,
            move |event| {
                let _ = inputs.send(DriverInput::Stream(event));
            },
        );
        tracing::info!(url = handle.url().unwrap_or("<unset>"), "backend stream started");
        self.stream = Some(handle);
    }

    fn on_start(&mut self, state: &mut ConsoleState, run_id: u64, seed: Option<Scalar>) {
        let record = state.active_run().map(|run| EventRecord {
            id: run.id,
            time: run.started_at,
            kind: RECORD_KIND.to_string(),
            level: "Medium".to_string(),
            status: RecordStatus::Detected,
            source: "Backend".to_string(),
        });
        if let Some(record) = record {
            state.set_record(record);
        }
        let api = Arc::clone(&self.api);
        spawn_control_call(&state.inputs, ControlOp::Start, Some(run_id), async move {
            api.start_run(seed).await
        });
    }

    fn on_approve(&mut self, state: &mut ConsoleState, module: Module) {
        let api = Arc::clone(&self.api);
        spawn_control_call(
            &state.inputs,
            ControlOp::Approve(module),
            state.active_id(),
            async move { api.approve(module).await },
        );
    }

    fn on_abort(&mut self, state: &mut ConsoleState, run_id: u64) {
        let api = Arc::clone(&self.api);
        spawn_control_call(&state.inputs, ControlOp::Abort, Some(run_id), async move {
            api.abort().await
        });
    }

    fn on_health(&mut self, state: &mut ConsoleState) {
        let api = Arc::clone(&self.api);
        spawn_control_call(&state.inputs, ControlOp::Health, state.active_id(), async move {
            api.health().await
        });
    }

    fn on_input(&mut self, state: &mut ConsoleState, input: DriverInput) {
        match input {
            DriverInput::Stream(event) => self.on_stream(state, event),
            DriverInput::Control(reply) => self.on_control_reply(state, reply),
            DriverInput::Tick { .. } => {}
        }
    }

    async fn teardown(&mut self, state: &mut ConsoleState) {
        if let Some(stream) = self.stream.take() {
            stream.close().await;
        }
        state.set_connection(ConnectionState::Idle);
    }
}

/// Map a backend event type onto the resolved-event vocabulary.
///
/// Accepts bare names (`END`, `ABORTED`) and `SIM_`-prefixed ones.
pub(crate) fn classify_terminal(kind: &str) -> Option<Terminal> {
    let upper = kind.trim().to_ascii_uppercase();
    let name = upper.strip_prefix("SIM_").unwrap_or(&upper);
    match name {
        "END" | "TARGET_NEUTRALIZED" => Some(Terminal::Success),
        "ABORT" | "ABORTED" => Some(Terminal::Abort),
        "FAILED" | "ERROR" => Some(Terminal::Failure),
        _ => None,
    }
}

fn is_started(kind: &str) -> bool {
    let upper = kind.trim().to_ascii_uppercase();
    upper == "SIM_STARTED" || upper == "STARTED"
}

fn infer_record_status(kind: &str, terminal: Option<Terminal>) -> RecordStatus {
    let upper = kind.trim().to_ascii_uppercase();
    if !(upper.starts_with("SIM_") || upper == "WAIT_FOR_APPROVAL" || terminal.is_some()) {
        return RecordStatus::Detected;
    }
    if terminal.is_some() {
        RecordStatus::Resolved
    } else if is_started(&upper) {
        RecordStatus::Detected
    } else {
        RecordStatus::InProgress
    }
}

/// Map a free-form status label (English or Turkish) onto the record status.
pub(crate) fn normalize_record_status(label: &str) -> RecordStatus {
    match label.trim() {
        "Detected" => return RecordStatus::Detected,
        "In Progress" => return RecordStatus::InProgress,
        "Resolved" => return RecordStatus::Resolved,
        _ => {}
    }
    let lower = label.to_lowercase();
    const IN_PROGRESS: &[&str] = &[
        "izle", "sınıfl", "sinif", "doğrula", "dogrula", "mitig", "karşı", "karsi", "caydır",
        "caydir", "in progress", "angaj",
    ];
    const RESOLVED: &[&str] = &["sonuç", "sonuc", "etkisiz", "resolved", "alarm"];
    if contains_any(&lower, &["tespit", "gözle", "gozle"]) {
        RecordStatus::Detected
    } else if contains_any(&lower, IN_PROGRESS) {
        RecordStatus::InProgress
    } else if contains_any(&lower, RESOLVED) {
        RecordStatus::Resolved
    } else {
        RecordStatus::Detected
    }
}

/// Human text carried by an event, if any.
fn event_detail(obj: &serde_json::Map<String, Value>) -> Option<String> {
    string_field(obj, &["message", "description", "detail", "text"])
}

fn string_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn close_diagnostic(code: u16, reason: &str, clean: bool) -> String {
    if reason.is_empty() {
        format!("stream closed (code={code} clean={clean})")
    } else {
        format!("stream closed (code={code} reason={reason} clean={clean})")
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_vocabulary_with_and_without_prefix() {
        assert_eq!(classify_terminal("SIM_END"), Some(Terminal::Success));
        assert_eq!(
            classify_terminal("sim_target_neutralized"),
            Some(Terminal::Success)
        );
        assert_eq!(classify_terminal("ABORTED"), Some(Terminal::Abort));
        assert_eq!(classify_terminal("SIM_ABORT"), Some(Terminal::Abort));
        assert_eq!(classify_terminal("SIM_FAILED"), Some(Terminal::Failure));
        assert_eq!(classify_terminal("error"), Some(Terminal::Failure));
        assert_eq!(classify_terminal("SIM_STARTED"), None);
        assert_eq!(classify_terminal("SIM_STEP"), None);
    }

    #[test]
    fn record_status_is_inferred_for_sim_events_only() {
        assert_eq!(
            infer_record_status("SIM_STARTED", None),
            RecordStatus::Detected
        );
        assert_eq!(infer_record_status("SIM_STEP", None), RecordStatus::InProgress);
        assert_eq!(
            infer_record_status("WAIT_FOR_APPROVAL", None),
            RecordStatus::InProgress
        );
        assert_eq!(
            infer_record_status("SIM_END", classify_terminal("SIM_END")),
            RecordStatus::Resolved
        );
        assert_eq!(infer_record_status("radar", None), RecordStatus::Detected);
    }

    #[test]
    fn free_form_status_labels_are_normalized() {
        assert_eq!(normalize_record_status("In Progress"), RecordStatus::InProgress);
        assert_eq!(normalize_record_status("Hedef izleniyor"), RecordStatus::InProgress);
        assert_eq!(normalize_record_status("Angajman"), RecordStatus::InProgress);
        assert_eq!(normalize_record_status("Tespit edildi"), RecordStatus::Detected);
        assert_eq!(normalize_record_status("Hedef etkisiz"), RecordStatus::Resolved);
        assert_eq!(normalize_record_status("???"), RecordStatus::Detected);
    }

    #[test]
    fn event_detail_prefers_message_then_description() {
        let obj = json!({"type": "SIM_FAILED", "description": "d", "message": "m"});
        assert_eq!(
            event_detail(obj.as_object().expect("object")).as_deref(),
            Some("m")
        );
        let obj = json!({"type": "SIM_FAILED", "message": "  ", "text": "t"});
        assert_eq!(
            event_detail(obj.as_object().expect("object")).as_deref(),
            Some("t")
        );
        let obj = json!({"type": "SIM_END"});
        assert!(event_detail(obj.as_object().expect("object")).is_none());
    }

    #[test]
    fn close_diagnostic_names_code_reason_and_cleanliness() {
        assert_eq!(
            close_diagnostic(1006, "", false),
            "stream closed (code=1006 clean=false)"
        );
        assert_eq!(
            close_diagnostic(1000, "bye", true),
            "stream closed (code=1000 reason=bye clean=true)"
        );
    }
}
