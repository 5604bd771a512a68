//! Recommendation envelopes: per-module success/duration/cost metrics.
//!
//! These arrive as whole JSON frames that the stream demux does not treat as
//! events, so they are read from the raw message forward.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::Module;

/// Display-ready metrics for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleMetrics {
    pub success: Option<String>,
    pub duration: Option<String>,
    pub cost: Option<String>,
    pub status: Option<String>,
}

/// Latest recommendation, keyed by upper-cased module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub metrics_by_module: BTreeMap<String, ModuleMetrics>,
}

/// Decode a recommendation envelope; `None` for any other frame.
pub fn decode_recommendation(envelope: &Value) -> Option<Recommendation> {
    let obj = envelope.as_object()?;
    let kind = first_present(obj, &["type", "kind", "eventType"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_uppercase();
    if !kind.contains("RECOMMENDATION") {
        return None;
    }

    let payload = obj
        .get("payload")
        .or_else(|| obj.get("data"))
        .and_then(Value::as_object)
        .unwrap_or(obj);

    let modules = first_present(payload, &["modules", "metricsByModule", "moduleMetrics"])
        .or_else(|| payload.get("recommendation").and_then(|r| r.get("modules")));

    let mut metrics_by_module = BTreeMap::new();
    match modules {
        Some(Value::Array(items)) => {
            for item in items {
                let Some(entry) = item.as_object() else {
                    continue;
                };
                let name = first_present(entry, &["name", "module"])
                    .map(value_text)
                    .unwrap_or_default()
                    .to_uppercase();
                if name.is_empty() {
                    continue;
                }
                metrics_by_module.insert(name, normalize_metrics(entry));
            }
        }
        Some(Value::Object(map)) => {
            for (name, raw) in map {
                let metrics = raw.as_object().map(normalize_metrics).unwrap_or_default();
                metrics_by_module.insert(name.to_uppercase(), metrics);
            }
        }
        _ => {}
    }

    for module in Module::ALL {
        let key = module.as_str();
        if metrics_by_module.contains_key(key) {
            continue;
        }
        if let Some(raw) = payload.get(key).and_then(Value::as_object) {
            metrics_by_module.insert(key.to_string(), normalize_metrics(raw));
        }
    }

    if metrics_by_module.is_empty() {
        return None;
    }
    Some(Recommendation { metrics_by_module })
}

fn normalize_metrics(raw: &Map<String, Value>) -> ModuleMetrics {
    ModuleMetrics {
        success: first_present(raw, &["success", "successRate", "pSuccess", "p_success"])
            .and_then(to_pct),
        duration: first_present(
            raw,
            &["duration", "time", "eta", "durationSec", "durationSeconds"],
        )
        .and_then(|v| with_unit(v, "sn")),
        cost: first_present(raw, &["cost", "maliyet", "costTry", "costTL"])
            .and_then(|v| with_unit(v, "₺")),
        status: first_present(raw, &["status", "state", "fit", "fitness"]).map(value_text),
    }
}

/// First key whose value is present and not null.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn to_pct(value: &Value) -> Option<String> {
    if value.as_str().is_some_and(str::is_empty) {
        return None;
    }
    match numeric(value) {
        Some(n) => {
            let pct = if n <= 1.0 { n * 100.0 } else { n };
            Some(format!("{}%", pct.round()))
        }
        None => Some(value_text(value)),
    }
}

fn with_unit(value: &Value, unit: &str) -> Option<String> {
    if value.as_str().is_some_and(str::is_empty) {
        return None;
    }
    match numeric(value) {
        Some(n) => Some(format!("{} {unit}", n.round())),
        None => Some(value_text(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_modules_are_normalized() {
        let envelope = json!({
            "type": "SIM_RECOMMENDATION",
            "payload": {
                "modules": [
                    {"name": "boran", "successRate": 0.87, "eta": 41.6, "cost": 1200, "fit": "uygun"},
                    {"module": "MIXED", "success": "70%", "duration": "~1 dk"}
                ]
            }
        });
        let rec = decode_recommendation(&envelope).expect("recommendation");
        let boran = &rec.metrics_by_module["BORAN"];
        assert_eq!(boran.success.as_deref(), Some("87%"));
        assert_eq!(boran.duration.as_deref(), Some("42 sn"));
        assert_eq!(boran.cost.as_deref(), Some("1200 ₺"));
        assert_eq!(boran.status.as_deref(), Some("uygun"));
        let mixed = &rec.metrics_by_module["MIXED"];
        assert_eq!(mixed.success.as_deref(), Some("70%"));
        assert_eq!(mixed.duration.as_deref(), Some("~1 dk"));
    }

    #[test]
    fn object_map_and_top_level_fallback() {
        let envelope = json!({
            "kind": "recommendation",
            "data": {
                "metricsByModule": {"yura": {"pSuccess": 55}},
                "ALBATUR": {"success": 0.4}
            }
        });
        let rec = decode_recommendation(&envelope).expect("recommendation");
        assert_eq!(rec.metrics_by_module["YURA"].success.as_deref(), Some("55%"));
        assert_eq!(rec.metrics_by_module["ALBATUR"].success.as_deref(), Some("40%"));
    }

    #[test]
    fn unrelated_frames_are_ignored() {
        assert_eq!(decode_recommendation(&json!({"type": "SIM_STARTED"})), None);
        assert_eq!(decode_recommendation(&json!("text")), None);
        assert_eq!(
            decode_recommendation(&json!({"type": "SIM_RECOMMENDATION", "payload": {}})),
            None
        );
    }
}
