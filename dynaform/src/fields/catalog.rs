//! Catalog fields: selects whose options come from an external catalog.

use crate::config::{FieldConfig, RawFieldConfig, TypeOptions};
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::fields::select;
use crate::form::Form;
use crate::lookup::Lookups;
use crate::registry::{FieldType, ValueSource};
use dynaform_store::ItemQuery;
use serde_json::Value;

/// Select backed by one catalog category. Options are fetched once, at
/// config build time, titled by the configured catalog attribute.
pub struct CatalogType;

impl FieldType for CatalogType {
    fn shape_config(&self, raw: &RawFieldConfig, lookups: &Lookups) -> Result<TypeOptions> {
        let category_id = raw.category_id.clone().ok_or_else(|| {
            DynaformError::invalid_config(&raw.name, "catalog field requires categoryId")
        })?;
        let title_field = raw.title_field.clone().ok_or_else(|| {
            DynaformError::invalid_config(&raw.name, "catalog field requires titleField")
        })?;
        let options = lookups.catalog.options(&category_id, &title_field)?;
        Ok(TypeOptions::Catalog {
            select: select::shape_settings(raw, options),
            category_id,
            title_field,
        })
    }

    fn normalize(&self, config: &FieldConfig, value: Value, _ctx: &crate::context::FormContext) -> Value {
        match config.options.select() {
            Some(settings) => select::coerce(settings, value),
            None => value,
        }
    }

    fn render_text(&self, field: &Field, source: ValueSource, _form: &Form) -> String {
        match field.config().options.select() {
            Some(settings) => select::render(settings, field.source_data(source)),
            None => String::new(),
        }
    }

    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, _form: &Form) {
        if let Some(settings) = config.options.select() {
            select::filter(query, settings, &config.name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{CatalogLookup, SelectOption};
    use serde_json::json;
    use std::sync::Arc;

    struct FixedCatalog;

    impl CatalogLookup for FixedCatalog {
        fn options(&self, category_id: &Value, title_field: &str) -> Result<Vec<SelectOption>> {
            assert_eq!(category_id, &json!(7));
            assert_eq!(title_field, "name");
            Ok(vec![
                SelectOption::new("Widget", json!(10)),
                SelectOption::new("Anvil", json!(11)),
            ])
        }
    }

    #[test]
    fn shape_pulls_options_from_catalog() {
        let lookups = Lookups {
            catalog: Arc::new(FixedCatalog),
            ..Lookups::default()
        };
        let raw = RawFieldConfig {
            name: "product".to_string(),
            title: "Product".to_string(),
            type_id: "catalog".to_string(),
            category_id: Some(json!(7)),
            title_field: Some("name".to_string()),
            ..Default::default()
        };
        let options = CatalogType.shape_config(&raw, &lookups).unwrap();
        let settings = options.select().unwrap();
        assert_eq!(settings.options[0].title, "Anvil");
        assert_eq!(settings.options[1].title, "Widget");
    }

    #[test]
    fn shape_requires_category() {
        let raw = RawFieldConfig {
            name: "product".to_string(),
            title: "Product".to_string(),
            type_id: "catalog".to_string(),
            title_field: Some("name".to_string()),
            ..Default::default()
        };
        let err = CatalogType
            .shape_config(&raw, &Lookups::default())
            .unwrap_err();
        assert!(matches!(err, DynaformError::InvalidConfig { .. }));
    }
}
