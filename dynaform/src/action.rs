//! Audit actions as presented to callers.

use crate::context::FormContext;
use crate::error::{DynaformError, Result};
use crate::event::FieldDiff;
use crate::lookup::Lookups;
use dynaform_store::{ActionId, ActionRecord, ChangeKind, ItemId};

/// One audit trail entry, resolved for display: the acting user's name,
/// the formatted timestamp and the per-field diffs.
#[derive(Debug, Clone)]
pub struct Action {
    pub id: ActionId,
    pub user_name: String,
    pub item_id: ItemId,
    pub kind: ChangeKind,
    pub fields: Vec<FieldDiff>,
    pub created_text: String,
}

impl Action {
    pub(crate) fn from_record(
        record: ActionRecord,
        lookups: &Lookups,
        ctx: &FormContext,
    ) -> Result<Self> {
        let user_name = match &record.user_id {
            Some(id) => lookups
                .users
                .find(id)
                .ok_or_else(|| DynaformError::not_found("user", id.to_string()))?
                .name,
            None => String::new(),
        };
        Ok(Self {
            id: record.id,
            user_name,
            item_id: record.item_id,
            kind: record.kind,
            fields: serde_json::from_value(record.data)?,
            created_text: ctx.format_datetime(record.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn resolves_diffs_and_timestamp() {
        let record = ActionRecord {
            id: ActionId::new(),
            user_id: None,
            item_id: ItemId::from_string("i1"),
            kind: ChangeKind::Edit,
            data: json!([
                { "name": "title", "title": "Title", "old_text": "a", "new_text": "b" }
            ]),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        };
        let action =
            Action::from_record(record, &Lookups::default(), &FormContext::default()).unwrap();
        assert_eq!(action.fields[0].old_text, "a");
        assert_eq!(action.fields[0].new_text.as_deref(), Some("b"));
        assert_eq!(action.created_text, "05.03.2024 10:00:00");
        assert_eq!(action.user_name, "");
    }
}
