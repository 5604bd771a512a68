//! Shared vocabulary types: engagement modules, loose scalars, run outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Engagement module an operator can approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Module {
    Boran,
    Albatur,
    Karma,
    Yura,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::Boran, Module::Albatur, Module::Karma, Module::Yura];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boran => "BORAN",
            Self::Albatur => "ALBATUR",
            Self::Karma => "KARMA",
            Self::Yura => "YURA",
        }
    }

    /// Name sent on the approve control call; the backend knows KARMA as MIXED.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Karma => "MIXED",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BORAN" => Ok(Self::Boran),
            "ALBATUR" => Ok(Self::Albatur),
            "KARMA" | "MIXED" => Ok(Self::Karma),
            "YURA" => Ok(Self::Yura),
            other => Err(format!(
                "unknown module `{other}` (expected BORAN, ALBATUR, KARMA or YURA)"
            )),
        }
    }
}

/// Loosely-typed telemetry value (seed, ammo, energy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Parse operator input: numbers stay numeric, anything else is text.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Self::Number(n)),
            _ => Some(Self::Text(trimmed.to_string())),
        }
    }

    /// Read a present, non-empty JSON value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Indeterminate,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Indeterminate => "indeterminate",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_parses_case_insensitively() {
        assert_eq!("boran".parse::<Module>(), Ok(Module::Boran));
        assert_eq!(" Yura ".parse::<Module>(), Ok(Module::Yura));
        assert_eq!("mixed".parse::<Module>(), Ok(Module::Karma));
        assert!("SAHIN".parse::<Module>().is_err());
    }

    #[test]
    fn karma_goes_over_the_wire_as_mixed() {
        assert_eq!(Module::Karma.wire_name(), "MIXED");
        assert_eq!(Module::Albatur.wire_name(), "ALBATUR");
    }

    #[test]
    fn scalar_parse_keeps_numbers_numeric() {
        assert_eq!(Scalar::parse("1234"), Some(Scalar::Number(1234.0)));
        assert_eq!(Scalar::parse("alpha-7"), Some(Scalar::Text("alpha-7".into())));
        assert_eq!(Scalar::parse("   "), None);
        assert_eq!(Scalar::Number(1234.0).to_string(), "1234");
    }

    #[test]
    fn scalar_from_json_skips_empty_values() {
        assert_eq!(Scalar::from_json(&json!(12)), Some(Scalar::Number(12.0)));
        assert_eq!(Scalar::from_json(&json!("")), None);
        assert_eq!(Scalar::from_json(&json!(null)), None);
    }
}
