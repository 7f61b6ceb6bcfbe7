//! Change events and the sink that turns them into audit actions.

use crate::error::Result;
use chrono::Utc;
use dynaform_store::{ActionId, ActionRecord, ActionStore, ChangeKind, ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Before/after display text of one field, as captured at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub name: String,
    pub title: String,
    pub old_text: String,
    /// `None` on delete: the field ceased to exist
    pub new_text: Option<String>,
}

impl FieldDiff {
    /// Whether this diff records an actual change. A deleted field whose
    /// old text was already empty does not.
    pub fn is_change(&self) -> bool {
        self.new_text.as_deref().unwrap_or("") != self.old_text
    }
}

/// One committed change to one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub item_id: ItemId,
    pub kind: ChangeKind,
    pub user_id: Option<UserId>,
    pub fields: Vec<FieldDiff>,
}

impl ChangeEvent {
    /// The diffs worth recording
    pub fn retained(&self) -> Vec<FieldDiff> {
        self.fields
            .iter()
            .filter(|diff| diff.is_change())
            .cloned()
            .collect()
    }
}

/// Receives change events after a successful commit.
pub trait ChangeSink: Send + Sync {
    fn publish(&self, event: &ChangeEvent) -> Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn publish(&self, _event: &ChangeEvent) -> Result<()> {
        Ok(())
    }
}

/// Default sink: writes one audit action per event that carries at least
/// one real diff. Events whose diffs all filter out leave no trace.
pub struct ActionRecorder {
    actions: Arc<dyn ActionStore>,
}

impl ActionRecorder {
    pub fn new(actions: Arc<dyn ActionStore>) -> Self {
        Self { actions }
    }
}

impl ChangeSink for ActionRecorder {
    fn publish(&self, event: &ChangeEvent) -> Result<()> {
        let retained = event.retained();
        if retained.is_empty() {
            debug!(item_id = %event.item_id, "change event carried no diffs, skipping action");
            return Ok(());
        }
        let record = ActionRecord {
            id: ActionId::new(),
            user_id: event.user_id.clone(),
            item_id: event.item_id.clone(),
            kind: event.kind,
            data: serde_json::to_value(&retained)?,
            created_at: Utc::now(),
        };
        self.actions.append(record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(old: &str, new: Option<&str>) -> FieldDiff {
        FieldDiff {
            name: "f".to_string(),
            title: "F".to_string(),
            old_text: old.to_string(),
            new_text: new.map(str::to_string),
        }
    }

    #[test]
    fn unchanged_text_is_not_a_change() {
        assert!(!diff("x", Some("x")).is_change());
        assert!(diff("x", Some("y")).is_change());
        assert!(diff("", Some("y")).is_change());
    }

    #[test]
    fn deletion_of_empty_field_is_not_a_change() {
        assert!(!diff("", None).is_change());
        assert!(diff("x", None).is_change());
    }

    #[test]
    fn retained_filters_noise() {
        let event = ChangeEvent {
            item_id: ItemId::from_string("i1"),
            kind: ChangeKind::Edit,
            user_id: None,
            fields: vec![diff("a", Some("a")), diff("a", Some("b"))],
        };
        let retained = event.retained();
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].new_text.as_deref(), Some("b"));
    }
}
