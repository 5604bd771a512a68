//! Inbound frame demultiplexing.
//!
//! The backend has no fixed frame schema. Each text frame is classified with
//! shape heuristics into raw messages, log lines and discrete events. A single
//! frame may produce several outputs; their order is deterministic:
//! message first, then logs and events in payload order.

use serde_json::Value;

/// One classified piece of an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Whole decoded payload, always forwarded first for structured frames.
    Message(Value),
    Log(String),
    Event(Value),
}

/// Classify one text frame.
pub fn demux(text: &str) -> Vec<Inbound> {
    let Ok(payload) = serde_json::from_str::<Value>(text) else {
        // Unparseable frames degrade to plain log lines.
        return vec![Inbound::Log(text.to_string())];
    };
    let mut out = vec![Inbound::Message(payload.clone())];
    collect(&payload, &mut out);
    out
}

fn collect(data: &Value, out: &mut Vec<Inbound>) {
    match data {
        Value::Null => {}
        Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
        Value::String(text) => out.push(Inbound::Log(text.clone())),
        Value::Object(obj) => {
            if let Some(msg) = ["log", "message", "msg"]
                .iter()
                .filter_map(|key| obj.get(*key))
                .find_map(log_text)
            {
                out.push(Inbound::Log(msg));
            }

            if let Some(event) = obj.get("event").filter(|v| is_truthy(v)) {
                out.push(Inbound::Event(event.clone()));
                return;
            }
            if let Some(events) = obj.get("events").and_then(Value::as_array) {
                out.extend(events.iter().cloned().map(Inbound::Event));
                return;
            }
            if looks_like_event(obj) {
                out.push(Inbound::Event(data.clone()));
            }
        }
        Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Bare event: `type`, a timestamp, and an `id` or `source`.
fn looks_like_event(obj: &serde_json::Map<String, Value>) -> bool {
    let has = |key: &str| obj.get(key).is_some_and(is_truthy);
    has("type") && (has("time") || has("timestamp")) && (has("id") || has("source"))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn log_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
