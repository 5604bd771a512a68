//! Scripted step sequence for simulated runs.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioStep {
    pub step: u32,
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    #[serde(rename = "scenarioId")]
    pub id: String,
    #[serde(rename = "scenarioName")]
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

/// Event-record severity for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepLevel {
    Medium,
    High,
}

impl StepLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

const HIGH_LEVEL_KEYWORDS: &[&str] = &["roket", "rocket", "sürü", "yüksek"];

impl Scenario {
    /// Scenario used when no scenario file is configured.
    pub fn builtin() -> Self {
        let steps = [
            ("Radar taraması başladı, sektör 3 izleniyor", None),
            ("Temas tespit edildi: tekil hava hedefi", Some("Tespit")),
            ("Hedef sınıflandırılıyor: roket şüphesi", Some("Sınıflandırma")),
            ("İz doğrulandı, tehdit seviyesi yüksek", Some("Doğrulama")),
            ("Karşı tedbir modülleri hazırlanıyor", None),
            ("Angajman penceresi açıldı", Some("Angajman")),
            ("Müdahale sürüyor, hedef takipte", None),
            ("Hedef etkisiz hale getirildi", Some("Sonuç")),
        ];
        Self {
            id: "SCN-001".to_string(),
            name: "Kıyı Savunma Tatbikatı".to_string(),
            steps: steps
                .iter()
                .enumerate()
                .map(|(index, (description, status))| ScenarioStep {
                    step: index as u32 + 1,
                    description: (*description).to_string(),
                    status: status.map(str::to_string),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Severity of a step from its status (or description) text.
pub fn level_for_step(step: &ScenarioStep) -> StepLevel {
    let text = step
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&step.description)
        .to_lowercase();
    if HIGH_LEVEL_KEYWORDS.iter().any(|k| text.contains(k)) {
        StepLevel::High
    } else {
        StepLevel::Medium
    }
}

/// Load a scenario file: one scenario object, or an array whose first
/// element is used.
pub fn load_scenario(path: &Path) -> Result<Scenario, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    parse_scenario(&raw)
        .map_err(|msg| ConfigError::Invalid(format!("scenario {}: {msg}", path.display())))
}

fn parse_scenario(raw: &str) -> Result<Scenario, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let value = match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                return Err("empty scenario list".to_string());
            }
            items.swap_remove(0)
        }
        other => other,
    };
    let scenario: Scenario = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if scenario.is_empty() {
        return Err("scenario has no steps".to_string());
    }
    Ok(scenario)
}
