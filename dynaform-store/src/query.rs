//! Query model for record listings.
//!
//! Field types contribute filter conditions as [`Predicate`] values instead
//! of building backend-specific SQL. A store interprets the predicates it
//! receives; the in-memory store in this crate interprets all of them.

use crate::ids::{FieldRowId, ItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One filter condition against items or their field rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Predicate {
    /// Field value (stringified) contains `text`, case-insensitive
    FieldLike { name: String, text: String },
    /// Field value equals `value` exactly
    FieldEquals { name: String, value: Value },
    /// Field value is one of `values`
    FieldIn { name: String, values: Vec<Value> },
    /// Multi-value field contains `value`
    FieldContains { name: String, value: Value },
    /// Field value (scalar or multi) intersects `values`
    FieldAnyOf { name: String, values: Vec<Value> },
    /// Field value within a lexicographic range (datetime storage format)
    FieldRange {
        name: String,
        from: Option<String>,
        to: Option<String>,
    },
    /// Item creation timestamp within a range
    CreatedRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    /// Item owner is one of `users`
    OwnerIn { users: Vec<UserId> },
    /// Free-text search over all field values, case-insensitive
    TextSearch { text: String },
}

/// A query over item records: filter predicates, ordering, pagination.
///
/// Built by the form layer (each filterable field type pushes its own
/// predicates) and interpreted by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    predicates: Vec<Predicate>,
    order: Option<(String, bool)>,
    per_page: Option<usize>,
    page: usize,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Set the ordering: field name (or the synthetic `id` / `created_at`)
    /// and direction (`true` = ascending)
    pub fn set_order(&mut self, field: impl Into<String>, ascending: bool) {
        self.order = Some((field.into(), ascending));
    }

    /// Enable pagination. `page` is zero-based.
    pub fn paginate(&mut self, per_page: usize, page: usize) {
        self.per_page = Some(per_page);
        self.page = page;
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> Option<(&str, bool)> {
        self.order.as_ref().map(|(f, asc)| (f.as_str(), *asc))
    }

    pub fn per_page(&self) -> Option<usize> {
        self.per_page
    }

    pub fn page(&self) -> usize {
        self.page
    }
}

/// A uniqueness probe against the field-row table: does another row with
/// the same name and normalized data exist?
///
/// The owning form may narrow the probe (e.g. to a subset of items) before
/// it is executed.
#[derive(Debug, Clone)]
pub struct FieldQuery {
    /// Field name to match
    pub name: String,
    /// Normalized data to match exactly
    pub data: Value,
    /// Row to exclude (the probing field's own persisted row)
    pub exclude: Option<FieldRowId>,
    /// When set, only rows belonging to these items count
    pub scope_items: Option<Vec<ItemId>>,
}

impl FieldQuery {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            exclude: None,
            scope_items: None,
        }
    }

    /// Exclude one row id from the probe
    pub fn excluding(mut self, row: Option<FieldRowId>) -> Self {
        self.exclude = row;
        self
    }
}

/// A query over audit actions: most recent first, capped at `limit`.
#[derive(Debug, Clone)]
pub struct ActionQuery {
    /// Restrict to one item
    pub item_id: Option<ItemId>,
    /// Maximum number of actions returned
    pub limit: usize,
    /// When set, only actions by these users count
    pub user_ids: Option<Vec<UserId>>,
}

impl ActionQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            item_id: None,
            limit,
            user_ids: None,
        }
    }

    /// Scope to one item
    pub fn for_item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }
}
