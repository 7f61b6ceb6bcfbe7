//! Division fields: references into the organizational hierarchy.

use crate::config::{DivisionSettings, FieldConfig, RawFieldConfig, TypeOptions};
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::form::Form;
use crate::lookup::{DivisionCriteria, Lookups};
use crate::registry::{FieldType, ValueSource};
use crate::value::as_array;
use dynaform_store::{ItemQuery, Predicate};
use serde_json::Value;

fn settings(config: &FieldConfig) -> Option<&DivisionSettings> {
    match &config.options {
        TypeOptions::Divisions(settings) => Some(settings),
        _ => None,
    }
}

/// One or more division ids. Filtering goes through hierarchy criteria
/// (district, affiliate, format, subformat) rather than raw ids.
pub struct DivisionsType;

impl FieldType for DivisionsType {
    fn shape_config(&self, raw: &RawFieldConfig, lookups: &Lookups) -> Result<TypeOptions> {
        Ok(TypeOptions::Divisions(DivisionSettings {
            multiple: raw.multiple.unwrap_or(false),
            show_code: raw.show_code.unwrap_or(true),
            districts: lookups.divisions.districts(),
            affiliates: lookups.divisions.affiliates(),
            formats: lookups.divisions.formats(),
            subformats: lookups.divisions.subformats(),
        }))
    }

    /// Loaded single-value fields quietly keep only the first id; a config
    /// flipped from multiple to single must not make old items unreadable.
    fn normalize(&self, config: &FieldConfig, value: Value, _ctx: &crate::context::FormContext) -> Value {
        let mut ids = as_array(value);
        let multiple = settings(config).map(|s| s.multiple).unwrap_or(false);
        if !multiple {
            ids.truncate(1);
        }
        Value::Array(ids)
    }

    /// Incoming changes are stricter than loads: more than one id on a
    /// single-value field is an error, not a truncation.
    fn apply_change(
        &self,
        field: &mut Field,
        value: Value,
        _ctx: &crate::context::FormContext,
    ) -> Result<()> {
        let ids = as_array(value);
        let multiple = settings(field.config()).map(|s| s.multiple).unwrap_or(false);
        if !multiple && ids.len() > 1 {
            return Err(DynaformError::invalid_input(
                field.name(),
                "single-value division field given multiple ids",
            ));
        }
        field.set_data(Value::Array(ids));
        Ok(())
    }

    fn render_text(&self, field: &Field, source: ValueSource, form: &Form) -> String {
        let ids = match field.source_data(source) {
            Value::Array(items) => items.as_slice(),
            _ => &[],
        };
        let show_code = settings(field.config()).map(|s| s.show_code).unwrap_or(false);
        form.lookups()
            .divisions
            .by_ids(ids)
            .into_iter()
            .map(|division| {
                if show_code {
                    format!("{} {}", division.code, division.name)
                } else {
                    division.name
                }
            })
            .collect::<Vec<_>>()
            .join(",\n")
    }

    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, form: &Form) {
        let criteria: DivisionCriteria = match serde_json::from_value(value.clone()) {
            Ok(criteria) => criteria,
            Err(_) => return,
        };
        if criteria.is_empty() {
            return;
        }
        // Criteria collapse to the set of matching division ids; an empty
        // set must still constrain the query to nothing.
        let values = form.lookups().divisions.matching(&criteria);
        query.push(Predicate::FieldAnyOf {
            name: config.name.clone(),
            values,
        });
    }

    fn sortable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(multiple: bool) -> FieldConfig {
        FieldConfig {
            name: "division".to_string(),
            title: "Division".to_string(),
            type_id: "divisions".to_string(),
            visible: true,
            tag: None,
            valid_rules: Vec::new(),
            edit_rules: crate::config::EditRuleSpec::default(),
            sortable: false,
            filterable: true,
            options: TypeOptions::Divisions(DivisionSettings {
                multiple,
                ..Default::default()
            }),
            descriptor: "divisions".to_string(),
        }
    }

    #[test]
    fn normalize_truncates_single_value_fields() {
        let ctx = crate::context::FormContext::default();
        let v = DivisionsType.normalize(&config(false), json!([5, 6, 7]), &ctx);
        assert_eq!(v, json!([5]));
    }

    #[test]
    fn normalize_keeps_multi_value_lists() {
        let ctx = crate::context::FormContext::default();
        let v = DivisionsType.normalize(&config(true), json!([5, 6]), &ctx);
        assert_eq!(v, json!([5, 6]));
        assert_eq!(
            DivisionsType.normalize(&config(true), json!(5), &ctx),
            json!([5])
        );
    }

    #[test]
    fn divisions_are_not_sortable() {
        assert!(!DivisionsType.sortable());
    }
}
