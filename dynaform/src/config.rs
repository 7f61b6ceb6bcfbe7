//! Declarative field configuration.
//!
//! A form is described as an ordered list of [`RawFieldConfig`] entries,
//! usually deserialized from JSON. [`FormConfig::build`] resolves each
//! entry against the type registry, applies view overrides, and produces
//! the immutable per-field [`FieldConfig`] the engine runs on.

use crate::error::{DynaformError, Result};
use crate::lookup::{Lookups, SelectOption};
use crate::registry::FieldTypeRegistry;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Edit permission declaration: a literal verdict or a list of named rules
/// that must all pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EditRuleSpec {
    Fixed(bool),
    Names(Vec<String>),
}

impl Default for EditRuleSpec {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

/// Per-view override of one field entry.
///
/// Any key of the base entry may be overridden, including per-type
/// settings. Unrecognized keys merge into the entry's extra map so
/// custom types see them too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewOverride {
    /// Drop the field from this view entirely
    pub remove: bool,
    pub title: Option<String>,
    pub visible: Option<bool>,
    pub tag: Option<String>,
    pub valid_rules: Option<Vec<String>>,
    pub edit_rules: Option<EditRuleSpec>,
    pub options: Option<Vec<SelectOption>>,
    pub multiple: Option<bool>,
    pub filter_multiple: Option<bool>,
    pub show_time: Option<bool>,
    pub upload_route: Option<String>,
    pub download_route: Option<String>,
    pub category_id: Option<Value>,
    pub title_field: Option<String>,
    pub show_code: Option<bool>,
    pub on_filter_select: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One field entry as authored, before type resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFieldConfig {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub type_id: String,
    /// Registry key of a custom type implementation, overrides `type`
    pub type_class: Option<String>,
    pub visible: Option<bool>,
    pub tag: Option<String>,
    pub valid_rules: Vec<String>,
    pub edit_rules: Option<EditRuleSpec>,
    /// View-keyed overrides, stripped from the built config
    pub views: IndexMap<String, ViewOverride>,

    // Per-type settings; each field type picks the keys it needs.
    pub options: Option<Vec<SelectOption>>,
    pub multiple: Option<bool>,
    pub filter_multiple: Option<bool>,
    pub show_time: Option<bool>,
    pub upload_route: Option<String>,
    pub download_route: Option<String>,
    pub category_id: Option<Value>,
    pub title_field: Option<String>,
    pub show_code: Option<bool>,
    pub on_filter_select: Option<bool>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawFieldConfig {
    fn apply_view(&mut self, over: &ViewOverride) {
        if let Some(title) = &over.title {
            self.title = title.clone();
        }
        if over.visible.is_some() {
            self.visible = over.visible;
        }
        if over.tag.is_some() {
            self.tag = over.tag.clone();
        }
        if let Some(rules) = &over.valid_rules {
            self.valid_rules = rules.clone();
        }
        if over.edit_rules.is_some() {
            self.edit_rules = over.edit_rules.clone();
        }
        if over.options.is_some() {
            self.options = over.options.clone();
        }
        if over.multiple.is_some() {
            self.multiple = over.multiple;
        }
        if over.filter_multiple.is_some() {
            self.filter_multiple = over.filter_multiple;
        }
        if over.show_time.is_some() {
            self.show_time = over.show_time;
        }
        if over.upload_route.is_some() {
            self.upload_route = over.upload_route.clone();
        }
        if over.download_route.is_some() {
            self.download_route = over.download_route.clone();
        }
        if over.category_id.is_some() {
            self.category_id = over.category_id.clone();
        }
        if over.title_field.is_some() {
            self.title_field = over.title_field.clone();
        }
        if over.show_code.is_some() {
            self.show_code = over.show_code;
        }
        if over.on_filter_select.is_some() {
            self.on_filter_select = over.on_filter_select;
        }
        for (key, value) in &over.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Settings shared by select-shaped fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectSettings {
    /// Options sorted by title
    pub options: Vec<SelectOption>,
    pub multiple: bool,
    /// Filter accepts a list of exact values instead of one
    pub filter_multiple: bool,
}

/// Settings for division fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivisionSettings {
    pub multiple: bool,
    pub show_code: bool,
    pub districts: Vec<SelectOption>,
    pub affiliates: Vec<SelectOption>,
    pub formats: Vec<SelectOption>,
    pub subformats: Vec<SelectOption>,
}

/// Resolved per-type settings of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeOptions {
    /// Plain text, textarea and int fields carry no settings
    Plain,
    Select(SelectSettings),
    Catalog {
        select: SelectSettings,
        category_id: Value,
        title_field: String,
    },
    Datetime {
        show_time: bool,
    },
    Files {
        upload_route: String,
        download_route: String,
    },
    Divisions(DivisionSettings),
    /// Creation timestamp meta field
    Created,
    User {
        /// Filter by select over known users instead of name substring
        on_filter_select: bool,
        options: Vec<SelectOption>,
    },
    /// Settings of a registered custom type, kept as raw JSON
    Custom(Value),
}

impl TypeOptions {
    /// Select settings, present for select-shaped fields
    pub fn select(&self) -> Option<&SelectSettings> {
        match self {
            Self::Select(settings) => Some(settings),
            Self::Catalog { select, .. } => Some(select),
            _ => None,
        }
    }
}

/// Immutable configuration of one field, shared across items.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub name: String,
    pub title: String,
    pub type_id: String,
    pub visible: bool,
    pub tag: Option<String>,
    pub valid_rules: Vec<String>,
    pub edit_rules: EditRuleSpec,
    pub sortable: bool,
    pub filterable: bool,
    pub options: TypeOptions,
    /// Registry key the field type was resolved under
    pub(crate) descriptor: String,
}

/// The built, view-resolved configuration of a whole form.
#[derive(Debug, Clone, Default)]
pub struct FormConfig {
    fields: Vec<Arc<FieldConfig>>,
}

impl FormConfig {
    /// Resolve raw entries into a form configuration.
    ///
    /// When `view` is set, each entry's override for that view is merged
    /// in first; an override with `remove` drops the entry. View maps are
    /// never carried into the result. Duplicate field names are rejected.
    pub fn build(
        entries: Vec<RawFieldConfig>,
        view: Option<&str>,
        registry: &FieldTypeRegistry,
        lookups: &Lookups,
    ) -> Result<Self> {
        let mut fields: Vec<Arc<FieldConfig>> = Vec::with_capacity(entries.len());
        for mut raw in entries {
            if raw.name.is_empty() {
                return Err(DynaformError::invalid_config(
                    raw.title.clone(),
                    "field name must not be empty",
                ));
            }
            if let Some(view) = view {
                if let Some(over) = raw.views.get(view).cloned() {
                    if over.remove {
                        continue;
                    }
                    raw.apply_view(&over);
                }
            }
            if fields.iter().any(|f| f.name == raw.name) {
                return Err(DynaformError::invalid_config(
                    raw.name.clone(),
                    "duplicate field name",
                ));
            }
            let (descriptor, kind) = registry.resolve(&raw)?;
            let options = kind.shape_config(&raw, lookups)?;
            fields.push(Arc::new(FieldConfig {
                name: raw.name,
                title: raw.title,
                type_id: raw.type_id,
                visible: raw.visible.unwrap_or(true),
                tag: raw.tag,
                valid_rules: raw.valid_rules,
                edit_rules: raw.edit_rules.unwrap_or_default(),
                sortable: kind.sortable(),
                filterable: kind.filterable(),
                options,
                descriptor,
            }));
        }
        Ok(Self { fields })
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Arc<FieldConfig>] {
        &self.fields
    }

    /// Look up one field by name
    pub fn get(&self, name: &str) -> Option<&Arc<FieldConfig>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Vec<RawFieldConfig> {
        serde_json::from_value(value).unwrap()
    }

    fn build(entries: Vec<RawFieldConfig>, view: Option<&str>) -> Result<FormConfig> {
        FormConfig::build(
            entries,
            view,
            &FieldTypeRegistry::with_builtins(),
            &Lookups::default(),
        )
    }

    #[test]
    fn builds_in_declaration_order() {
        let entries = parse(json!([
            { "name": "title", "title": "Title", "type": "text" },
            { "name": "notes", "title": "Notes", "type": "textarea" },
        ]));
        let config = build(entries, None).unwrap();
        let names: Vec<_> = config.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "notes"]);
        assert!(config.fields()[0].visible);
        assert_eq!(config.fields()[0].options, TypeOptions::Plain);
    }

    #[test]
    fn rejects_duplicate_names() {
        let entries = parse(json!([
            { "name": "a", "title": "A", "type": "text" },
            { "name": "a", "title": "A again", "type": "text" },
        ]));
        let err = build(entries, None).unwrap_err();
        assert!(matches!(err, DynaformError::InvalidConfig { .. }));
    }

    #[test]
    fn view_remove_drops_field() {
        let entries = parse(json!([
            { "name": "a", "title": "A", "type": "text" },
            {
                "name": "b", "title": "B", "type": "text",
                "views": { "compact": { "remove": true } }
            },
        ]));
        let config = build(entries, Some("compact")).unwrap();
        assert_eq!(config.fields().len(), 1);
        assert!(config.get("b").is_none());
    }

    #[test]
    fn view_merges_overrides() {
        let entries = parse(json!([
            {
                "name": "a", "title": "A", "type": "text",
                "validRules": ["required"],
                "views": {
                    "admin": { "title": "A (admin)", "visible": false, "validRules": [] }
                }
            },
        ]));
        let config = build(entries, Some("admin")).unwrap();
        let field = config.get("a").unwrap();
        assert_eq!(field.title, "A (admin)");
        assert!(!field.visible);
        assert!(field.valid_rules.is_empty());

        // without the view, base settings apply
        let entries = parse(json!([
            {
                "name": "a", "title": "A", "type": "text",
                "validRules": ["required"],
                "views": { "admin": { "title": "A (admin)" } }
            },
        ]));
        let config = build(entries, None).unwrap();
        assert_eq!(config.get("a").unwrap().title, "A");
    }

    #[test]
    fn view_overrides_type_settings() {
        let entries = parse(json!([
            {
                "name": "due", "title": "Due", "type": "datetime",
                "views": { "compact": { "showTime": false } }
            },
            {
                "name": "status", "title": "Status", "type": "select",
                "options": [
                    { "title": "Open", "value": 1 },
                    { "title": "Done", "value": 2 },
                ],
                "views": {
                    "compact": {
                        "multiple": true,
                        "options": [{ "title": "Open", "value": 1 }]
                    }
                }
            },
        ]));
        let config = build(entries, Some("compact")).unwrap();
        assert_eq!(
            config.get("due").unwrap().options,
            TypeOptions::Datetime { show_time: false }
        );
        let select = config.get("status").unwrap().options.select().unwrap();
        assert!(select.multiple);
        assert_eq!(select.options.len(), 1);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let entries = parse(json!([
            { "name": "a", "title": "A", "type": "geo" },
        ]));
        let err = build(entries, None).unwrap_err();
        assert!(matches!(err, DynaformError::UnknownFieldType { .. }));
    }

    #[test]
    fn edit_rule_spec_parses_both_shapes() {
        let raw: RawFieldConfig =
            serde_json::from_value(json!({ "name": "a", "title": "A", "type": "text", "editRules": false }))
                .unwrap();
        assert_eq!(raw.edit_rules, Some(EditRuleSpec::Fixed(false)));

        let raw: RawFieldConfig = serde_json::from_value(
            json!({ "name": "a", "title": "A", "type": "text", "editRules": ["ownerOnly"] }),
        )
        .unwrap();
        assert_eq!(
            raw.edit_rules,
            Some(EditRuleSpec::Names(vec!["ownerOnly".to_string()]))
        );
    }
}
