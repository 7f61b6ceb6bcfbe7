//! Storage contracts consumed by the form engine.
//!
//! The engine never talks to a concrete backend. It holds one
//! [`RecordStore`] per item type plus a [`FieldStore`] for per-field rows
//! and an [`ActionStore`] for the audit trail. The in-memory implementation
//! lives in [`crate::memory`]; production deployments supply their own.

use crate::error::Result;
use crate::ids::{ActionId, FieldRowId, ItemId, UserId};
use crate::query::{ActionQuery, FieldQuery, ItemQuery, Predicate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of change an action records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Create,
    Edit,
    Delete,
}

/// One persisted field row: the normalized data of one field of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldRowId>,
    pub item_id: ItemId,
    pub name: String,
    pub data: Value,
}

impl FieldRow {
    pub fn new(item_id: ItemId, name: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            item_id,
            name: name.into(),
            data,
        }
    }
}

/// One persisted audit action. `data` is the serialized field diff list;
/// its shape belongs to the engine, the store treats it as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub item_id: ItemId,
    pub kind: ChangeKind,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// A handle to one item record, staged until [`save`](ItemRecord::save).
///
/// `get`/`set` address field attributes by name. `save` must commit the
/// record attributes and one field row per set attribute in a single
/// atomic step: a failure leaves no partial state. `delete` is equally
/// atomic (record plus its rows).
pub trait ItemRecord {
    /// Record id, present once persisted
    fn id(&self) -> Option<ItemId>;

    /// Owning user, if stamped
    fn user_id(&self) -> Option<UserId>;

    /// Stamp the owning user (done once, on create)
    fn set_user(&mut self, user: Option<UserId>);

    /// Creation timestamp, present once persisted
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Read a staged or persisted field attribute
    fn get(&self, name: &str) -> Option<Value>;

    /// Stage a field attribute
    fn set(&mut self, name: &str, value: Value);

    /// Whether the backing record exists in the store
    fn is_persisted(&self) -> bool;

    /// Commit the record and its field rows atomically
    fn save(&mut self) -> Result<()>;

    /// Delete the record and its field rows atomically
    fn delete(&mut self) -> Result<()>;
}

/// Store adapter for item records of one form.
pub trait RecordStore: Send + Sync {
    /// A fresh, unpersisted record
    fn create(&self) -> Box<dyn ItemRecord>;

    /// Open an existing record
    fn open(&self, id: &ItemId) -> Result<Box<dyn ItemRecord>>;

    /// Start an empty query
    fn query(&self) -> ItemQuery {
        ItemQuery::new()
    }

    /// Apply free-text search. The default does nothing; adapters opt in.
    fn search(&self, query: &mut ItemQuery, text: &str) {
        let _ = (query, text);
    }

    /// Apply ordering by field name (or synthetic `id` / `created_at`)
    fn order_by(&self, query: &mut ItemQuery, field: &str, ascending: bool) {
        query.set_order(field, ascending);
    }

    /// Apply a case-insensitive substring filter on one field
    fn like_filter(&self, query: &mut ItemQuery, field: &str, text: &str) {
        query.push(Predicate::FieldLike {
            name: field.into(),
            text: text.to_lowercase(),
        });
    }

    /// Execute the query. Returns the matched page of records and the
    /// total match count (pre-pagination).
    fn fetch(&self, query: &ItemQuery) -> Result<(Vec<Box<dyn ItemRecord>>, usize)>;
}

/// Store adapter for per-field rows, keyed by `(item_id, name)`.
///
/// Rows are written by [`ItemRecord::save`] as part of the record commit;
/// this adapter only reads them back.
pub trait FieldStore: Send + Sync {
    /// Read one row
    fn get(&self, item_id: &ItemId, name: &str) -> Result<Option<FieldRow>>;

    /// Does another row with the same `(name, data)` exist?
    ///
    /// Runs at validation time, before the write it guards; callers rely
    /// on the engine's single-threaded request model, not on this probe,
    /// for correctness under concurrency.
    fn duplicate_exists(&self, query: &FieldQuery) -> Result<bool>;
}

/// Store adapter for the audit trail.
pub trait ActionStore: Send + Sync {
    /// Append one action
    fn append(&self, record: ActionRecord) -> Result<ActionId>;

    /// List actions, most recent first, capped at `query.limit`
    fn list(&self, query: &ActionQuery) -> Result<Vec<ActionRecord>>;
}
