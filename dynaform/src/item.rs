//! An item: one record materialized through the form's field config.

use crate::error::{DynaformError, Result};
use crate::event::{ChangeEvent, FieldDiff};
use crate::field::Field;
use crate::form::Form;
use crate::registry::ValueSource;
use crate::rules::RuleScope;
use dynaform_store::{ChangeKind, ItemId, ItemRecord, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Item facts fields and rules may read while the field list itself is
/// being mutated.
#[derive(Debug, Clone, Default)]
pub struct ItemMeta {
    pub id: Option<ItemId>,
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub created_text: String,
}

/// One incoming field value, addressed by name.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSeed {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Initial values for a new item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub fields: Vec<FieldSeed>,
}

/// Value changes to apply to an existing item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeRequest {
    #[serde(default)]
    pub fields: Vec<FieldSeed>,
}

/// Validation failures of one field, keyed for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct FieldErrors {
    pub name: String,
    pub errors: Vec<String>,
}

/// One record with its fields materialized in config order.
///
/// The backing record is staged: nothing reaches the store until
/// [`save`](Item::save), which validates first and commits atomically.
pub struct Item {
    id: Option<ItemId>,
    fields: Vec<Field>,
    user_id: Option<UserId>,
    user_name: String,
    created_text: String,
    errors: Vec<FieldErrors>,
    record: Option<Box<dyn ItemRecord>>,
}

impl Item {
    /// Materialize a loaded record. Fields follow config order regardless
    /// of what the record carries: config is the source of shape.
    pub(crate) fn from_record(form: &Form, record: Box<dyn ItemRecord>) -> Result<Self> {
        let mut fields = Vec::with_capacity(form.config().fields().len());
        for config in form.config().fields() {
            fields.push(Field::from_record(form, record.as_ref(), config.clone())?);
        }
        let mut item = Self {
            id: record.id(),
            fields,
            user_id: record.user_id(),
            user_name: String::new(),
            created_text: record
                .created_at()
                .map(|t| form.context().format_datetime(t))
                .unwrap_or_default(),
            errors: Vec::new(),
            record: Some(record),
        };
        item.resolve_user(form)?;
        item.attach_fields(form);
        Ok(item)
    }

    /// Fresh item seeded from a payload. Names the config does not know
    /// are dropped; configured fields missing from the payload come up
    /// empty.
    pub(crate) fn from_payload(form: &Form, payload: ItemPayload) -> Result<Self> {
        let record = form.records().create();
        let mut fields = Vec::with_capacity(form.config().fields().len());
        for config in form.config().fields() {
            let seed = payload
                .fields
                .iter()
                .find(|seed| seed.name == config.name)
                .map(|seed| seed.value.clone());
            fields.push(match seed {
                Some(value) => Field::from_value(form, config.clone(), value)?,
                None => Field::empty(form, config.clone())?,
            });
        }
        let mut item = Self {
            id: None,
            fields,
            user_id: form.context().user_id().cloned(),
            user_name: String::new(),
            created_text: String::new(),
            errors: Vec::new(),
            record: Some(record),
        };
        item.resolve_user(form)?;
        item.attach_fields(form);
        Ok(item)
    }

    pub(crate) fn empty(form: &Form) -> Result<Self> {
        Self::from_payload(form, ItemPayload::default())
    }

    fn resolve_user(&mut self, form: &Form) -> Result<()> {
        self.user_name = match &self.user_id {
            Some(id) => form
                .lookups()
                .users
                .find(id)
                .ok_or_else(|| DynaformError::not_found("user", id.to_string()))?
                .name,
            None => String::new(),
        };
        Ok(())
    }

    fn attach_fields(&mut self, form: &Form) {
        let meta = self.meta();
        for field in &mut self.fields {
            field.attach(&meta, form);
        }
    }

    /// Snapshot of the item facts rules and meta fields read
    pub fn meta(&self) -> ItemMeta {
        ItemMeta {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            created_text: self.created_text.clone(),
        }
    }

    /// Apply incoming value changes. Names the config does not know are
    /// ignored; locked fields swallow their change silently.
    pub fn change(&mut self, request: ChangeRequest, form: &Form) -> Result<()> {
        for seed in request.fields {
            match self.fields.iter_mut().find(|f| f.name() == seed.name) {
                Some(field) => field.change(seed.value, form)?,
                None => debug!(field = %seed.name, "change for unconfigured field ignored"),
            }
        }
        Ok(())
    }

    /// Run validation across all fields. Returns whether the item is valid;
    /// per-field messages land in [`errors`](Item::errors).
    pub fn check(&mut self, form: &Form) -> Result<bool> {
        let meta = self.meta();
        let scope = RuleScope {
            form,
            item: &meta,
        };
        let mut errors = Vec::new();
        for field in &mut self.fields {
            let messages = field.check(&scope)?;
            if !messages.is_empty() {
                errors.push(FieldErrors {
                    name: field.name().to_string(),
                    errors: messages,
                });
            }
        }
        self.errors = errors;
        Ok(self.errors.is_empty())
    }

    /// Validate and commit. Returns `Ok(false)` when validation fails
    /// (messages in [`errors`](Item::errors)); nothing is written in that
    /// case. On success every field row and the record commit together,
    /// and one change event is published.
    pub fn save(&mut self, form: &Form) -> Result<bool> {
        if !self.check(form)? {
            debug!(errors = self.errors.len(), "item failed validation, not saved");
            return Ok(false);
        }
        let mut record = self
            .record
            .take()
            .ok_or_else(|| DynaformError::not_found("item record", "detached"))?;
        let kind = if record.is_persisted() {
            ChangeKind::Edit
        } else {
            record.set_user(self.user_id.clone());
            ChangeKind::Create
        };
        let diffs: Vec<FieldDiff> = self
            .fields
            .iter()
            .filter(|field| !field.is_meta())
            .map(|field| FieldDiff {
                name: field.name().to_string(),
                title: field.config().title.clone(),
                old_text: field.render_text(ValueSource::Persisted, form),
                new_text: Some(field.render_text(ValueSource::Pending, form)),
            })
            .collect();
        for field in &self.fields {
            field.write_to(record.as_mut());
        }
        let committed = record.save();
        self.id = record.id();
        if let Some(created_at) = record.created_at() {
            self.created_text = form.context().format_datetime(created_at);
        }
        self.record = Some(record);
        committed?;

        let item_id = self
            .id
            .clone()
            .ok_or_else(|| DynaformError::not_found("item record", "id after save"))?;
        for field in &mut self.fields {
            if field.is_meta() {
                continue;
            }
            let row_id = form
                .field_rows()
                .get(&item_id, field.name())?
                .and_then(|row| row.id);
            field.refresh_after_save(item_id.clone(), row_id);
        }
        self.attach_fields(form);

        let event = ChangeEvent {
            item_id,
            kind,
            user_id: form.context().user_id().cloned(),
            fields: diffs,
        };
        form.sink().publish(&event)?;
        debug!(item_id = %event.item_id, kind = ?kind, "item saved");
        Ok(true)
    }

    /// Delete the item and its rows. Unpersisted items are a no-op. On
    /// success the item detaches from its record; the published diffs
    /// carry the last persisted texts with no after-state.
    pub fn delete(&mut self, form: &Form) -> Result<()> {
        let persisted = self
            .record
            .as_ref()
            .map(|record| record.is_persisted())
            .unwrap_or(false);
        if !persisted {
            debug!("delete of unpersisted item ignored");
            return Ok(());
        }
        let mut record = self
            .record
            .take()
            .ok_or_else(|| DynaformError::not_found("item record", "detached"))?;
        let item_id = self
            .id
            .clone()
            .ok_or_else(|| DynaformError::not_found("item record", "id before delete"))?;
        let diffs: Vec<FieldDiff> = self
            .fields
            .iter()
            .filter(|field| !field.is_meta())
            .map(|field| FieldDiff {
                name: field.name().to_string(),
                title: field.config().title.clone(),
                old_text: field.render_text(ValueSource::Persisted, form),
                new_text: None,
            })
            .collect();
        if let Err(err) = record.delete() {
            self.record = Some(record);
            return Err(err.into());
        }
        self.id = None;
        let event = ChangeEvent {
            item_id,
            kind: ChangeKind::Delete,
            user_id: form.context().user_id().cloned(),
            fields: diffs,
        };
        form.sink().publish(&event)?;
        debug!(item_id = %event.item_id, "item deleted");
        Ok(())
    }

    pub fn id(&self) -> Option<&ItemId> {
        self.id.as_ref()
    }

    /// Fields in config order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Per-field messages from the last validation run
    pub fn errors(&self) -> &[FieldErrors] {
        &self.errors
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Creation timestamp formatted for display, empty until persisted
    pub fn created_text(&self) -> &str {
        &self.created_text
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("fields", &self.fields.len())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> Form {
        let entries = serde_json::from_value(json!([
            { "name": "title", "title": "Title", "type": "text", "validRules": ["required"] },
            { "name": "notes", "title": "Notes", "type": "textarea" },
        ]))
        .unwrap();
        Form::builder(entries).build().unwrap()
    }

    fn request(value: Value) -> ChangeRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn payload_fields_follow_config_order() {
        let form = form();
        let payload: ItemPayload = serde_json::from_value(json!({
            "fields": [
                { "name": "notes", "value": "n" },
                { "name": "ghost", "value": "dropped" },
            ]
        }))
        .unwrap();
        let item = form.item_from_payload(payload).unwrap();
        let names: Vec<_> = item.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["title", "notes"]);
        assert_eq!(item.field("notes").unwrap().data(), &json!("n"));
        assert_eq!(item.field("title").unwrap().data(), &json!(""));
        assert!(item.field("ghost").is_none());
    }

    #[test]
    fn invalid_item_does_not_save() {
        let form = form();
        let mut item = form.new_item().unwrap();
        assert!(!item.save(&form).unwrap());
        assert!(item.id().is_none());
        assert_eq!(item.errors()[0].name, "title");

        let (items, total) = form.list_items(&Default::default()).unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn save_after_fix_persists_and_reloads() {
        let form = form();
        let mut item = form.new_item().unwrap();
        assert!(!item.save(&form).unwrap());

        item.change(request(json!({ "fields": [{ "name": "title", "value": "T" }] })), &form)
            .unwrap();
        assert!(item.save(&form).unwrap());
        assert!(item.errors().is_empty());
        let id = item.id().unwrap().clone();

        let loaded = form.load_item(&id).unwrap();
        assert_eq!(loaded.field("title").unwrap().data(), &json!("T"));
        assert!(!loaded.created_text().is_empty());
    }

    #[test]
    fn delete_removes_item() {
        let form = form();
        let mut item = form.new_item().unwrap();
        item.change(request(json!({ "fields": [{ "name": "title", "value": "T" }] })), &form)
            .unwrap();
        assert!(item.save(&form).unwrap());
        let id = item.id().unwrap().clone();

        item.delete(&form).unwrap();
        assert!(item.id().is_none());
        assert!(form.load_item(&id).is_err());
    }

    #[test]
    fn delete_of_unsaved_item_is_noop() {
        let form = form();
        let mut item = form.new_item().unwrap();
        item.delete(&form).unwrap();
        assert!(form.list_actions(None).unwrap().is_empty());
    }
}
