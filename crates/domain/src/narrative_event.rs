//! Narrative event response - the payload handed back to narrative pacing.
//!
//! The same shape is produced by fixtures and by the live model, so this
//! type doubles as the JSON contract the model is asked to follow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A discoverable story beat with player-facing choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeSnippet {
    pub id: String,
    pub text: String,
    /// Usually three or four labels
    pub choice_options: Vec<String>,
    /// Mechanical consequence per choice option label
    #[serde(default)]
    pub consequences: BTreeMap<String, serde_json::Value>,
    /// Requirements that gate the snippet (flags, items, quest stages)
    #[serde(default)]
    pub conditions: BTreeMap<String, serde_json::Value>,
}

/// A chapter-level narrative event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeEventResponse {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub snippets: Vec<NarrativeSnippet>,
}

impl NarrativeEventResponse {
    /// Check the invariants every producer must uphold.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation(
                "narrative event title cannot be empty",
            ));
        }
        for snippet in &self.snippets {
            if snippet.choice_options.is_empty() {
                return Err(DomainError::validation(format!(
                    "snippet '{}' has no choice options",
                    snippet.id
                )));
            }
        }
        Ok(())
    }
}
