//! Display tone for log lines.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Danger,
    Warn,
    Ok,
    Info,
}

const DANGER: &[&str] = &["error", "fail", "hata", "abort", "başarısız"];
const WARN: &[&str] = &["warn", "timeout", "zaman aşımı", "onay", "approval"];
const OK: &[&str] = &["success", "başarılı", "connected", "neutralized", "etkisiz"];

/// Drop a leading `SIM_<WORD>:` event prefix.
pub fn strip_sim_prefix(line: &str) -> &str {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix("SIM_") else {
        return line;
    };
    let Some((name, tail)) = rest.split_once(':') else {
        return line;
    };
    let is_event_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if is_event_name {
        tail.trim_start()
    } else {
        line
    }
}

pub fn tone_for(line: &str) -> Tone {
    let text = strip_sim_prefix(line).to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|word| text.contains(word));
    if has_any(DANGER) {
        Tone::Danger
    } else if has_any(WARN) {
        Tone::Warn
    } else if has_any(OK) {
        Tone::Ok
    } else {
        Tone::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_prefix_is_removed() {
        assert_eq!(strip_sim_prefix("SIM_TARGET_NEUTRALIZED: hedef etkisiz"), "hedef etkisiz");
        assert_eq!(strip_sim_prefix("SIM_lower: x"), "SIM_lower: x");
        assert_eq!(strip_sim_prefix("plain"), "plain");
    }

    #[test]
    fn tone_follows_keyword_priority() {
        assert_eq!(tone_for("Sim start FAILED: timeout"), Tone::Danger);
        assert_eq!(tone_for("Onay bekleniyor"), Tone::Warn);
        assert_eq!(tone_for("Stream connected"), Tone::Ok);
        assert_eq!(tone_for("Scenario step 2: radar sweep"), Tone::Info);
    }

    #[test]
    fn event_name_does_not_drive_tone() {
        assert_eq!(tone_for("SIM_ERROR_SUMMARY: all good, connected"), Tone::Ok);
    }
}
