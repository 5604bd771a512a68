//! Telemetry parsing over free-text backend log lines.
//!
//! The backend narrates its state as human-readable lines. A handful of
//! leading keywords carry structured fields:
//!
//! ```text
//! [12:04:01.250] TESPİT: Deniz Hedefi | Gemi | seviye=yüksek | ayaz=82
//! KOŞULLAR: Açık | rüzgar=12kt | görüş=8km
//! KAYNAK: BORAN menzil uygun | YURA yeniden dolduruluyor
//! TEHDİT: kritik
//! ÖNERİ DURUMU: PRIMARY=BORAN ALTERNATİF=YURA
//! ```
//!
//! [`parse_line`] turns one such line into a [`StatusPatch`]. Everything else
//! yields `None`, which is the common case. Parsing is pure and never panics.

mod recommendation;
mod status;
mod tone;

pub use recommendation::{decode_recommendation, ModuleMetrics, Recommendation};
pub use status::{
    ClassificationStatus, EnvironmentStatus, RecommendationStatus, StatusPatch, ThreatStatus,
    TraceStatus,
};
pub use tone::{strip_sim_prefix, tone_for, Tone};

use crate::types::Module;

/// Parse one log line into a status patch, or `None` if unrecognized.
pub fn parse_line(line: &str) -> Option<StatusPatch> {
    let raw = line.trim();
    if raw.is_empty() {
        return None;
    }
    let msg = strip_timestamp(raw);
    let (head, body) = msg.split_once(':')?;
    match fold_turkish(head).as_str() {
        "tespit" => Some(parse_detection(body)),
        "kosullar" => Some(parse_conditions(body)),
        "kaynak" => Some(parse_resources(body)),
        "tehdit" => parse_threat_level(body),
        "oneri durumu" => Some(parse_recommendation_state(body)),
        _ => None,
    }
}

/// Drop a leading `[hh:mm:ss.mmm]` style stamp.
fn strip_timestamp(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix('[') else {
        return raw;
    };
    let Some((stamp, tail)) = rest.split_once(']') else {
        return raw;
    };
    let is_stamp =
        !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.');
    if is_stamp {
        tail.trim_start()
    } else {
        raw
    }
}

/// Lowercase with Turkish letters folded to ASCII and whitespace collapsed.
pub(crate) fn fold_turkish(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' | 'I' | 'ı' | 'i' => folded.push('i'),
            'Ş' | 'ş' => folded.push('s'),
            'Ğ' | 'ğ' => folded.push('g'),
            'Ü' | 'ü' => folded.push('u'),
            'Ö' | 'ö' => folded.push('o'),
            'Ç' | 'ç' => folded.push('c'),
            other => folded.extend(other.to_lowercase()),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase with Turkish dotted/dotless i rules.
fn upper_tr(text: &str) -> String {
    let mut upper = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'i' => upper.push('İ'),
            'ı' => upper.push('I'),
            other => upper.extend(other.to_uppercase()),
        }
    }
    upper
}

fn split_parts(body: &str) -> Vec<&str> {
    body.split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn key_value(part: &str) -> Option<(String, &str)> {
    let (key, value) = part.split_once('=')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((fold_turkish(key), value))
}

fn parse_detection(body: &str) -> StatusPatch {
    let mut patch = StatusPatch::default();
    let parts = split_parts(body);
    // Title and tag are positional; key=value pairs only follow them.
    patch.threat.title = parts.first().map(|s| s.to_string());
    patch.threat.tag = parts.get(1).map(|s| s.to_string());

    for (key, value) in parts.iter().skip(2).filter_map(|part| key_value(part)) {
        if key.contains("seviye") || key.contains("level") {
            patch.classification.level = Some(upper_tr(value));
        }
        if key.contains("ayaz") {
            patch.trace.ayaz = Some(if value.contains('%') {
                value.to_string()
            } else {
                format!("{value}%")
            });
        }
    }
    patch
}

fn parse_conditions(body: &str) -> StatusPatch {
    let mut patch = StatusPatch::default();
    let parts = split_parts(body);
    patch.environment.status = parts
        .iter()
        .find(|part| !part.contains('='))
        .map(|s| s.to_string());

    for (key, value) in parts.iter().filter_map(|part| key_value(part)) {
        if key.contains("ruzgar") || key.contains("wind") {
            patch.environment.wind = Some(value.to_string());
        }
        if key.contains("gorus") || key.contains("visibility") {
            patch.environment.visibility = Some(value.to_string());
        }
    }
    patch
}

fn parse_resources(body: &str) -> StatusPatch {
    let mut patch = StatusPatch::default();
    for part in split_parts(body) {
        let Some((token, rest)) = part.split_once(char::is_whitespace) else {
            continue;
        };
        let Some(module) = Module::ALL
            .into_iter()
            .find(|module| module.as_str().eq_ignore_ascii_case(token))
        else {
            continue;
        };
        let rest = rest.trim();
        if !rest.is_empty() {
            patch.resource.insert(module, rest.to_string());
        }
    }
    patch
}

fn parse_threat_level(body: &str) -> Option<StatusPatch> {
    let level = body.trim();
    if level.is_empty() {
        return None;
    }
    let mut patch = StatusPatch::default();
    patch.classification.level = Some(upper_tr(level));
    Some(patch)
}

fn parse_recommendation_state(body: &str) -> StatusPatch {
    let mut patch = StatusPatch::default();
    let spaced = body.replace('=', " = ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    patch.recommendation.primary = keyed_token(&tokens, "primary");
    patch.recommendation.alt = keyed_token(&tokens, "alternatif");
    patch
}

/// Find `<...key> = <VALUE>` and return the word-character prefix of VALUE.
fn keyed_token(tokens: &[&str], key: &str) -> Option<String> {
    tokens.windows(3).find_map(|window| {
        if window[1] != "=" || !fold_turkish(window[0]).ends_with(key) {
            return None;
        }
        let value: String = window[2]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        (!value.is_empty()).then(|| value.to_uppercase())
    })
}
