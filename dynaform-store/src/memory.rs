//! In-memory reference store.
//!
//! Implements every storage contract behind a single `RwLock`, which is
//! what makes record save/delete atomic here: the whole commit happens in
//! one locked section. Used as the test double throughout the workspace
//! and as a starting point for real adapters.

use crate::error::{Result, StoreError};
use crate::ids::{ActionId, FieldRowId, ItemId, UserId};
use crate::query::{ActionQuery, FieldQuery, ItemQuery, Predicate};
use crate::record::{ActionRecord, ActionStore, FieldRow, FieldStore, ItemRecord, RecordStore};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredItem {
    id: ItemId,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
    values: IndexMap<String, Value>,
}

#[derive(Debug, Default)]
struct Inner {
    items: IndexMap<ItemId, StoredItem>,
    rows: Vec<FieldRow>,
    actions: Vec<ActionRecord>,
}

/// In-memory implementation of [`RecordStore`], [`FieldStore`] and
/// [`ActionStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle, convenient when one store backs several contracts
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))
    }
}

/// Render a value for substring matching: strings as-is, scalars via
/// `to_string`, arrays as a comma-joined list.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn matches(item: &StoredItem, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::FieldLike { name, text } => item
            .values
            .get(name)
            .map(|v| value_text(v).to_lowercase().contains(text))
            .unwrap_or(false),
        Predicate::FieldEquals { name, value } => item.values.get(name) == Some(value),
        Predicate::FieldIn { name, values } => item
            .values
            .get(name)
            .map(|v| values.contains(v))
            .unwrap_or(false),
        Predicate::FieldContains { name, value } => match item.values.get(name) {
            Some(Value::Array(items)) => items.contains(value),
            _ => false,
        },
        Predicate::FieldAnyOf { name, values } => match item.values.get(name) {
            Some(Value::Array(items)) => items.iter().any(|v| values.contains(v)),
            Some(v) => values.contains(v),
            None => false,
        },
        Predicate::FieldRange { name, from, to } => {
            let Some(v) = item.values.get(name) else {
                return false;
            };
            let text = value_text(v);
            if text.is_empty() {
                return false;
            }
            if let Some(from) = from {
                if text.as_str() < from.as_str() {
                    return false;
                }
            }
            if let Some(to) = to {
                if text.as_str() > to.as_str() {
                    return false;
                }
            }
            true
        }
        Predicate::CreatedRange { from, to } => {
            if let Some(from) = from {
                if item.created_at < *from {
                    return false;
                }
            }
            if let Some(to) = to {
                if item.created_at > *to {
                    return false;
                }
            }
            true
        }
        Predicate::OwnerIn { users } => item
            .user_id
            .as_ref()
            .map(|u| users.contains(u))
            .unwrap_or(false),
        Predicate::TextSearch { text } => item
            .values
            .values()
            .any(|v| value_text(v).to_lowercase().contains(text)),
    }
}

/// Record handle over the in-memory store. Stages attribute writes until
/// `save`, then commits record and field rows under one write lock.
pub struct MemoryRecord {
    inner: Arc<RwLock<Inner>>,
    id: Option<ItemId>,
    user_id: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    values: IndexMap<String, Value>,
    persisted: bool,
}

impl MemoryRecord {
    fn fresh(inner: Arc<RwLock<Inner>>) -> Self {
        Self {
            inner,
            id: None,
            user_id: None,
            created_at: None,
            values: IndexMap::new(),
            persisted: false,
        }
    }

    fn from_stored(inner: Arc<RwLock<Inner>>, stored: &StoredItem) -> Self {
        Self {
            inner,
            id: Some(stored.id.clone()),
            user_id: stored.user_id.clone(),
            created_at: Some(stored.created_at),
            values: stored.values.clone(),
            persisted: true,
        }
    }
}

impl ItemRecord for MemoryRecord {
    fn id(&self) -> Option<ItemId> {
        self.id.clone()
    }

    fn user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }

    fn set_user(&mut self, user: Option<UserId>) {
        self.user_id = user;
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn save(&mut self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        let minted = !self.persisted;
        if minted {
            self.id = Some(ItemId::new());
            self.created_at = Some(Utc::now());
            self.persisted = true;
        }
        let id = self.id.clone().expect("persisted record has an id");
        if minted {
            debug!(%id, "record created");
        }
        let created_at = self.created_at.expect("persisted record has a timestamp");

        inner.items.insert(
            id.clone(),
            StoredItem {
                id: id.clone(),
                user_id: self.user_id.clone(),
                created_at,
                values: self.values.clone(),
            },
        );

        // One field row per staged attribute, keyed by (item_id, name).
        for (name, data) in &self.values {
            match inner
                .rows
                .iter_mut()
                .find(|r| r.item_id == id && r.name == *name)
            {
                Some(row) => row.data = data.clone(),
                None => inner.rows.push(FieldRow {
                    id: Some(FieldRowId::new()),
                    item_id: id.clone(),
                    name: name.clone(),
                    data: data.clone(),
                }),
            }
        }

        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        if !self.persisted {
            return Err(StoreError::Detached {
                operation: "deleted".into(),
            });
        }
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        let id = self.id.clone().expect("persisted record has an id");
        inner.items.shift_remove(&id);
        inner.rows.retain(|r| r.item_id != id);
        self.persisted = false;
        self.id = None;
        debug!(%id, "record deleted");
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn create(&self) -> Box<dyn ItemRecord> {
        Box::new(MemoryRecord::fresh(self.inner.clone()))
    }

    fn open(&self, id: &ItemId) -> Result<Box<dyn ItemRecord>> {
        let inner = self.read()?;
        let stored = inner
            .items
            .get(id)
            .ok_or_else(|| StoreError::RecordNotFound { id: id.to_string() })?;
        Ok(Box::new(MemoryRecord::from_stored(
            self.inner.clone(),
            stored,
        )))
    }

    fn search(&self, query: &mut ItemQuery, text: &str) {
        query.push(Predicate::TextSearch {
            text: text.to_lowercase(),
        });
    }

    fn fetch(&self, query: &ItemQuery) -> Result<(Vec<Box<dyn ItemRecord>>, usize)> {
        let inner = self.read()?;

        let mut matched: Vec<&StoredItem> = inner
            .items
            .values()
            .filter(|item| query.predicates().iter().all(|p| matches(item, p)))
            .collect();

        if let Some((field, ascending)) = query.order() {
            match field {
                // ids mint in insertion order and the map already yields
                // that order; sorting the id strings would shuffle
                // same-millisecond ids by their random component
                "id" => {}
                "created_at" => matched.sort_by_key(|item| item.created_at),
                name => matched.sort_by(|a, b| {
                    let left = a.values.get(name).map(value_text).unwrap_or_default();
                    let right = b.values.get(name).map(value_text).unwrap_or_default();
                    left.cmp(&right)
                }),
            }
            if !ascending {
                matched.reverse();
            }
        }

        let total = matched.len();
        let page: Vec<Box<dyn ItemRecord>> = match query.per_page() {
            Some(per_page) => matched
                .into_iter()
                .skip(query.page() * per_page)
                .take(per_page)
                .map(|s| Box::new(MemoryRecord::from_stored(self.inner.clone(), s)) as _)
                .collect(),
            None => matched
                .into_iter()
                .map(|s| Box::new(MemoryRecord::from_stored(self.inner.clone(), s)) as _)
                .collect(),
        };

        Ok((page, total))
    }
}

impl FieldStore for MemoryStore {
    fn get(&self, item_id: &ItemId, name: &str) -> Result<Option<FieldRow>> {
        let inner = self.read()?;
        Ok(inner
            .rows
            .iter()
            .find(|r| &r.item_id == item_id && r.name == name)
            .cloned())
    }

    fn duplicate_exists(&self, query: &FieldQuery) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.rows.iter().any(|row| {
            row.name == query.name
                && row.data == query.data
                && (query.exclude.is_none() || row.id != query.exclude)
                && query
                    .scope_items
                    .as_ref()
                    .map(|items| items.contains(&row.item_id))
                    .unwrap_or(true)
        }))
    }
}

impl ActionStore for MemoryStore {
    fn append(&self, record: ActionRecord) -> Result<ActionId> {
        let id = record.id.clone();
        self.write()?.actions.push(record);
        Ok(id)
    }

    fn list(&self, query: &ActionQuery) -> Result<Vec<ActionRecord>> {
        let inner = self.read()?;
        let mut actions: Vec<(usize, ActionRecord)> = inner
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| {
                query
                    .item_id
                    .as_ref()
                    .map(|id| &a.item_id == id)
                    .unwrap_or(true)
            })
            .filter(|(_, a)| match (&query.user_ids, &a.user_id) {
                (Some(users), Some(user)) => users.contains(user),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|(i, a)| (i, a.clone()))
            .collect();
        // insertion order breaks timestamp ties
        actions.sort_by_key(|(i, a)| std::cmp::Reverse((a.created_at, *i)));
        actions.truncate(query.limit);
        Ok(actions.into_iter().map(|(_, a)| a).collect())
    }
}
