//! Player narrative snapshot - the read-only view of a player's story so far.
//!
//! Snapshots are produced by the quest/inventory layer and handed to the
//! director as plain values. The director reads them to build prompts and
//! pick fixtures; it never writes back.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// A choice the player made, tagged for narrative bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceTag {
    pub tag: String,
    pub recorded_at: DateTime<Utc>,
}

impl ChoiceTag {
    pub fn new(tag: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            tag: tag.into(),
            recorded_at,
        }
    }
}

/// Progress on a single quest line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub quest_id: String,
    /// Free-form stage label owned by the quest catalog (e.g. "gathering_thread")
    pub stage: String,
    #[serde(default)]
    pub completed: bool,
}

impl QuestProgress {
    pub fn new(quest_id: impl Into<String>, stage: impl Into<String>, completed: bool) -> Self {
        Self {
            quest_id: quest_id.into(),
            stage: stage.into(),
            completed,
        }
    }

    /// Compact `quest@stage` form used in prompts, with a `✓` suffix once done.
    pub fn compact(&self) -> String {
        if self.completed {
            format!("{}@{}✓", self.quest_id, self.stage)
        } else {
            format!("{}@{}", self.quest_id, self.stage)
        }
    }
}

/// Immutable snapshot of everything the director may know about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNarrativeSnapshot {
    pub player_id: PlayerId,
    /// Choices in the order they were made
    #[serde(default)]
    pub choice_log: Vec<ChoiceTag>,
    #[serde(default)]
    pub quest_progress: Vec<QuestProgress>,
    /// Ordered so prompts render identically for equal snapshots
    #[serde(default)]
    pub active_effects: BTreeSet<String>,
}

impl PlayerNarrativeSnapshot {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            choice_log: Vec::new(),
            quest_progress: Vec::new(),
            active_effects: BTreeSet::new(),
        }
    }

    pub fn with_choice(mut self, choice: ChoiceTag) -> Self {
        self.choice_log.push(choice);
        self
    }

    pub fn with_quest(mut self, quest: QuestProgress) -> Self {
        self.quest_progress.push(quest);
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.active_effects.insert(effect.into());
        self
    }
}

/// One dispatch invocation: who it is for and why it was triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub snapshot: PlayerNarrativeSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_reason: Option<String>,
}

impl DispatchRequest {
    /// Blank trigger reasons are treated as absent.
    pub fn new(snapshot: PlayerNarrativeSnapshot, trigger_reason: Option<String>) -> Self {
        let trigger_reason = trigger_reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        Self {
            snapshot,
            trigger_reason,
        }
    }

    pub fn trigger_reason(&self) -> Option<&str> {
        self.trigger_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn snapshot() -> PlayerNarrativeSnapshot {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        PlayerNarrativeSnapshot::new(PlayerId::from_uuid(Uuid::nil()))
            .with_choice(ChoiceTag::new("spared_the_moth", at))
            .with_quest(QuestProgress::new("lost_thimble", "searching", false))
            .with_effect("threadbare")
    }

    #[test]
    fn blank_trigger_reason_becomes_none() {
        let request = DispatchRequest::new(snapshot(), Some("   ".to_string()));
        assert_eq!(request.trigger_reason(), None);

        let request = DispatchRequest::new(snapshot(), Some(" market_day ".to_string()));
        assert_eq!(request.trigger_reason(), Some("market_day"));
    }

    #[test]
    fn compact_quest_marks_completion() {
        assert_eq!(
            QuestProgress::new("lost_thimble", "returned", true).compact(),
            "lost_thimble@returned✓"
        );
        assert_eq!(
            QuestProgress::new("lost_thimble", "searching", false).compact(),
            "lost_thimble@searching"
        );
    }

    #[test]
    fn snapshot_uses_camel_case_json() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert!(json.get("playerId").is_some());
        assert!(json.get("choiceLog").is_some());
        assert_eq!(json["questProgress"][0]["questId"], "lost_thimble");
        assert_eq!(json["activeEffects"][0], "threadbare");
    }
}
