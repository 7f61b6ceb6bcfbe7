//! A field bound to one item: value, editability, validation state.

use crate::config::{EditRuleSpec, FieldConfig};
use crate::error::Result;
use crate::form::Form;
use crate::item::ItemMeta;
use crate::registry::{FieldType, ValueSource};
use crate::rules::{EditRule, RuleScope, ValidRule};
use dynaform_store::{FieldRowId, ItemId, ItemRecord};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Resolved edit permission: a config-fixed verdict or a rule vote.
enum EditBinding {
    Fixed(bool),
    Rules(Vec<Arc<dyn EditRule>>),
}

/// One field of one item.
///
/// Carries the staged value (`data`), the last persisted value, the
/// rendered display text, and the validation messages from the last
/// `check`. Built by [`crate::item::Item`] in config order; never
/// constructed directly.
pub struct Field {
    name: String,
    item_id: Option<ItemId>,
    row_id: Option<FieldRowId>,
    can_edit: bool,
    data: Value,
    stored: Option<Value>,
    value_text: String,
    errors: Vec<String>,
    config: Arc<FieldConfig>,
    kind: Arc<dyn FieldType>,
    valid_rules: Vec<Arc<dyn ValidRule>>,
    edit_binding: EditBinding,
}

impl Field {
    fn base(form: &Form, config: Arc<FieldConfig>) -> Result<Self> {
        let kind = form.descriptor(&config)?;
        let mut valid_rules = Vec::with_capacity(config.valid_rules.len());
        for name in &config.valid_rules {
            match form.valid_rule(name) {
                Some(rule) => valid_rules.push(rule),
                // unknown rule names are dropped, not fatal: configs
                // outlive rule registrations
                None => debug!(field = %config.name, rule = %name, "unknown validation rule"),
            }
        }
        let edit_binding = match &config.edit_rules {
            EditRuleSpec::Fixed(verdict) => EditBinding::Fixed(*verdict),
            EditRuleSpec::Names(names) => {
                let mut rules = Vec::with_capacity(names.len());
                for name in names {
                    match form.edit_rule(name) {
                        Some(rule) => rules.push(rule),
                        None => debug!(field = %config.name, rule = %name, "unknown edit rule"),
                    }
                }
                EditBinding::Rules(rules)
            }
        };
        Ok(Self {
            name: config.name.clone(),
            item_id: None,
            row_id: None,
            can_edit: true,
            data: Value::Null,
            stored: None,
            value_text: String::new(),
            errors: Vec::new(),
            config,
            kind,
            valid_rules,
            edit_binding,
        })
    }

    /// Field loaded from a record; the persisted value becomes the diff
    /// baseline.
    pub(crate) fn from_record(
        form: &Form,
        record: &dyn ItemRecord,
        config: Arc<FieldConfig>,
    ) -> Result<Self> {
        let mut field = Self::base(form, config)?;
        let raw = record.get(&field.name).unwrap_or(Value::Null);
        field.data = field.kind.normalize(&field.config, raw, form.context());
        if record.is_persisted() {
            field.stored = Some(field.data.clone());
            if let Some(item_id) = record.id() {
                field.row_id = form
                    .field_rows()
                    .get(&item_id, &field.name)?
                    .and_then(|row| row.id);
            }
        }
        Ok(field)
    }

    /// Field seeded with an incoming value, not yet persisted
    pub(crate) fn from_value(form: &Form, config: Arc<FieldConfig>, value: Value) -> Result<Self> {
        let mut field = Self::base(form, config)?;
        field.data = field.kind.normalize(&field.config, value, form.context());
        Ok(field)
    }

    /// Field with its type's empty value
    pub(crate) fn empty(form: &Form, config: Arc<FieldConfig>) -> Result<Self> {
        Self::from_value(form, config, Value::Null)
    }

    /// Bind the field to its item: run the type's attach hook, settle
    /// editability, refresh display text.
    pub(crate) fn attach(&mut self, meta: &ItemMeta, form: &Form) {
        self.item_id = meta.id.clone();
        let kind = self.kind.clone();
        kind.attach(self, meta);
        self.can_edit = if kind.is_meta() {
            false
        } else {
            match &self.edit_binding {
                EditBinding::Fixed(verdict) => *verdict,
                EditBinding::Rules(rules) => {
                    let scope = RuleScope { form, item: meta };
                    rules.iter().all(|rule| rule.handle(&scope, self))
                }
            }
        };
        self.value_text = kind.render_text(self, ValueSource::Pending, form);
    }

    /// Apply an incoming value. Locked and meta fields ignore changes.
    pub(crate) fn change(&mut self, value: Value, form: &Form) -> Result<()> {
        if !self.can_edit || self.kind.is_meta() {
            debug!(field = %self.name, "change ignored, field not editable");
            return Ok(());
        }
        let kind = self.kind.clone();
        kind.apply_change(self, value, form.context())?;
        self.value_text = kind.render_text(self, ValueSource::Pending, form);
        Ok(())
    }

    /// Run validation rules, replacing the field's message list.
    /// Returns the messages by value so callers can keep reading the field.
    pub(crate) fn check(&mut self, scope: &RuleScope<'_>) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        if !self.kind.is_meta() {
            for rule in &self.valid_rules {
                errors.extend(rule.handle(scope, self)?);
            }
        }
        self.errors = errors.clone();
        Ok(errors)
    }

    /// Stage the value onto the record. Meta fields never write.
    pub(crate) fn write_to(&self, record: &mut dyn ItemRecord) {
        if !self.kind.is_meta() {
            record.set(&self.name, self.data.clone());
        }
    }

    /// Render one of the field's values as display text
    pub(crate) fn render_text(&self, source: ValueSource, form: &Form) -> String {
        self.kind.clone().render_text(self, source, form)
    }

    /// Adopt the persisted state after a successful save
    pub(crate) fn refresh_after_save(&mut self, item_id: ItemId, row_id: Option<FieldRowId>) {
        self.item_id = Some(item_id);
        self.row_id = row_id;
        self.stored = Some(self.data.clone());
    }

    pub(crate) fn is_meta(&self) -> bool {
        self.kind.is_meta()
    }

    // Accessors, also used by FieldType implementations.

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// The staged value
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Replace the staged value. Intended for [`FieldType`] implementations;
    /// application code goes through `change` so editability applies.
    pub fn set_data(&mut self, value: Value) {
        self.data = value;
    }

    /// The staged or last persisted value
    pub fn source_data(&self, source: ValueSource) -> &Value {
        match source {
            ValueSource::Pending => &self.data,
            ValueSource::Persisted => self.stored.as_ref().unwrap_or(&Value::Null),
        }
    }

    /// Display text of the staged value
    pub fn value_text(&self) -> &str {
        &self.value_text
    }

    /// Messages from the last validation run
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn can_edit(&self) -> bool {
        self.can_edit
    }

    /// Id of the field's persisted row, once known
    pub fn row_id(&self) -> Option<&FieldRowId> {
        self.row_id.as_ref()
    }

    pub fn item_id(&self) -> Option<&ItemId> {
        self.item_id.as_ref()
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("can_edit", &self.can_edit)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(entries: Value) -> Form {
        Form::builder(serde_json::from_value(entries).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_rule_names_are_dropped() {
        let form = form(json!([
            { "name": "a", "title": "A", "type": "text", "validRules": ["required", "no-such-rule"] },
        ]));
        let mut item = form.new_item().unwrap();
        // only `required` fires; the unknown rule is gone, not an error
        assert!(!item.check(&form).unwrap());
        assert_eq!(item.errors()[0].errors, ["required"]);
    }

    #[test]
    fn fixed_edit_rule_locks_field() {
        let form = form(json!([
            { "name": "a", "title": "A", "type": "text", "editRules": false },
        ]));
        let mut item = form.new_item().unwrap();
        item.change(
            serde_json::from_value(json!({ "fields": [{ "name": "a", "value": "nope" }] }))
                .unwrap(),
            &form,
        )
        .unwrap();
        assert_eq!(item.field("a").unwrap().data(), &json!(""));
        assert!(!item.field("a").unwrap().can_edit());
    }

    #[test]
    fn meta_fields_are_never_editable() {
        let form = form(json!([
            { "name": "created", "title": "Created", "type": "itemCreated" },
        ]));
        let item = form.new_item().unwrap();
        assert!(!item.field("created").unwrap().can_edit());
    }
}
