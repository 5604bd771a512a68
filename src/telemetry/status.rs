//! Derived display status and its monotone merge.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::Module;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreatStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ayaz: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Partial status; also used as the accumulated status itself.
///
/// Merging is field-wise: a present field overwrites, an absent field leaves
/// the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusPatch {
    #[serde(skip_serializing_if = "is_default")]
    pub threat: ThreatStatus,
    #[serde(skip_serializing_if = "is_default")]
    pub classification: ClassificationStatus,
    #[serde(skip_serializing_if = "is_default")]
    pub trace: TraceStatus,
    #[serde(skip_serializing_if = "is_default")]
    pub environment: EnvironmentStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource: BTreeMap<Module, String>,
    #[serde(skip_serializing_if = "is_default")]
    pub recommendation: RecommendationStatus,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

fn overlay(slot: &mut Option<String>, patch: &Option<String>) {
    if let Some(value) = patch {
        *slot = Some(value.clone());
    }
}

impl StatusPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Deep-merge `patch` into `self`.
    pub fn merge(&mut self, patch: &StatusPatch) {
        overlay(&mut self.threat.title, &patch.threat.title);
        overlay(&mut self.threat.tag, &patch.threat.tag);
        overlay(&mut self.classification.level, &patch.classification.level);
        overlay(&mut self.trace.ayaz, &patch.trace.ayaz);
        overlay(&mut self.environment.status, &patch.environment.status);
        overlay(&mut self.environment.wind, &patch.environment.wind);
        overlay(&mut self.environment.visibility, &patch.environment.visibility);
        for (module, text) in &patch.resource {
            self.resource.insert(*module, text.clone());
        }
        overlay(&mut self.recommendation.primary, &patch.recommendation.primary);
        overlay(&mut self.recommendation.alt, &patch.recommendation.alt);
    }
}
