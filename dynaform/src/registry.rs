//! Field type behavior and the registry that resolves config entries to it.

use crate::config::{FieldConfig, RawFieldConfig, TypeOptions};
use crate::context::FormContext;
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::form::Form;
use crate::item::ItemMeta;
use crate::lookup::Lookups;
use crate::value::{is_empty_value, value_text};
use dynaform_store::ItemQuery;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Which value of a field to read: the staged one or the last persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Pending,
    Persisted,
}

/// Behavior of one field type.
///
/// Implementations are stateless and shared: one instance serves every
/// field of that type across all forms. Per-field state lives in
/// [`FieldConfig`] (resolved settings) and [`Field`] (values).
pub trait FieldType: Send + Sync {
    /// Validate and resolve the per-type settings of a raw config entry
    fn shape_config(&self, raw: &RawFieldConfig, lookups: &Lookups) -> Result<TypeOptions>;

    /// Normalize a loaded or incoming value into storage shape.
    ///
    /// Must be lenient: values already in the store pass through here and
    /// may predate config changes.
    fn normalize(&self, config: &FieldConfig, value: Value, ctx: &FormContext) -> Value {
        let _ = (config, ctx);
        match value {
            Value::Null => Value::String(String::new()),
            other => other,
        }
    }

    /// Apply a caller-supplied value change to the field.
    ///
    /// Unlike [`normalize`](Self::normalize), this may reject input.
    fn apply_change(&self, field: &mut Field, value: Value, ctx: &FormContext) -> Result<()> {
        let value = self.normalize(field.config(), value, ctx);
        field.set_data(value);
        Ok(())
    }

    /// Render one of the field's values as display text
    fn render_text(&self, field: &Field, source: ValueSource, form: &Form) -> String {
        let _ = form;
        value_text(field.source_data(source))
    }

    /// Translate a filter value into query predicates.
    ///
    /// The default applies a case-insensitive substring match and skips
    /// empty filter values.
    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, form: &Form) {
        if is_empty_value(value) {
            return;
        }
        form.records()
            .like_filter(query, &config.name, &value_text(value));
    }

    /// Whether item lists may be ordered by this field
    fn sortable(&self) -> bool {
        true
    }

    /// Whether item lists may be filtered by this field
    fn filterable(&self) -> bool {
        true
    }

    /// Meta fields derive their value from the record itself, are never
    /// editable and are skipped on save
    fn is_meta(&self) -> bool {
        false
    }

    /// Hook run when the field is bound to an item
    fn attach(&self, field: &mut Field, meta: &ItemMeta) {
        let _ = (field, meta);
    }
}

/// Maps type tags (and custom type class keys) to [`FieldType`] instances.
pub struct FieldTypeRegistry {
    types: IndexMap<String, Arc<dyn FieldType>>,
}

impl FieldTypeRegistry {
    /// Registry with every built-in type under its standard tag
    pub fn with_builtins() -> Self {
        use crate::fields::{
            CatalogType, DatetimeType, DivisionsType, FilesType, ItemCreatedType, ItemUserType,
            PlainType, SelectType,
        };

        let mut registry = Self {
            types: IndexMap::new(),
        };
        let plain: Arc<dyn FieldType> = Arc::new(PlainType);
        registry.register("text", plain.clone());
        registry.register("textarea", plain.clone());
        registry.register("int", plain);
        registry.register("select", Arc::new(SelectType));
        registry.register("datetime", Arc::new(DatetimeType));
        registry.register("files", Arc::new(FilesType));
        registry.register("divisions", Arc::new(DivisionsType));
        registry.register("catalog", Arc::new(CatalogType));
        registry.register("itemCreated", Arc::new(ItemCreatedType));
        registry.register("itemUser", Arc::new(ItemUserType));
        registry
    }

    /// Register (or replace) a type under a key
    pub fn register(&mut self, key: impl Into<String>, kind: Arc<dyn FieldType>) {
        self.types.insert(key.into(), kind);
    }

    /// Look up a type by registry key
    pub fn get(&self, key: &str) -> Option<Arc<dyn FieldType>> {
        self.types.get(key).cloned()
    }

    /// Resolve a raw config entry to its type. `typeClass` wins over the
    /// `type` tag when both are set.
    pub fn resolve(&self, raw: &RawFieldConfig) -> Result<(String, Arc<dyn FieldType>)> {
        let key = raw.type_class.as_deref().unwrap_or(&raw.type_id);
        match self.get(key) {
            Some(kind) => Ok((key.to_string(), kind)),
            None => Err(DynaformError::unknown_field_type(key)),
        }
    }
}

impl std::fmt::Debug for FieldTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTypeRegistry")
            .field("keys", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(type_id: &str, type_class: Option<&str>) -> RawFieldConfig {
        RawFieldConfig {
            name: "f".to_string(),
            title: "F".to_string(),
            type_id: type_id.to_string(),
            type_class: type_class.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_builtin_tags() {
        let registry = FieldTypeRegistry::with_builtins();
        for tag in [
            "text",
            "textarea",
            "int",
            "select",
            "datetime",
            "files",
            "divisions",
            "catalog",
            "itemCreated",
            "itemUser",
        ] {
            let (key, _) = registry.resolve(&raw(tag, None)).unwrap();
            assert_eq!(key, tag);
        }
    }

    #[test]
    fn type_class_wins_over_tag() {
        let registry = FieldTypeRegistry::with_builtins();
        let (key, _) = registry.resolve(&raw("text", Some("select"))).unwrap();
        assert_eq!(key, "select");
    }

    #[test]
    fn unknown_key_errors() {
        let registry = FieldTypeRegistry::with_builtins();
        let err = match registry.resolve(&raw("geo", None)) {
            Err(err) => err,
            Ok(_) => panic!("unknown type must not resolve"),
        };
        assert_eq!(err.to_string(), "unknown field type: geo");
    }
}
