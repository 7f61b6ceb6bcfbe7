//! Select fields: a fixed option list, single or multiple choice.

use crate::config::{FieldConfig, RawFieldConfig, SelectSettings, TypeOptions};
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::form::Form;
use crate::lookup::{Lookups, SelectOption};
use crate::registry::{FieldType, ValueSource};
use crate::value::as_array;
use dynaform_store::{ItemQuery, Predicate};
use serde_json::Value;

/// Shared shaping for select-like settings, used by catalog fields too.
pub(crate) fn shape_settings(raw: &RawFieldConfig, options: Vec<SelectOption>) -> SelectSettings {
    let mut options = options;
    options.sort_by(|a, b| a.title.cmp(&b.title));
    SelectSettings {
        options,
        multiple: raw.multiple.unwrap_or(false),
        filter_multiple: raw.filter_multiple.unwrap_or(false),
    }
}

/// Coerce a value into the settings' storage shape: multiple stores a
/// list, single stores one scalar (an incoming list keeps its first
/// element).
pub(crate) fn coerce(settings: &SelectSettings, value: Value) -> Value {
    if settings.multiple {
        Value::Array(as_array(value))
    } else {
        match value {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::String(String::new())),
            Value::Null => Value::String(String::new()),
            other => other,
        }
    }
}

fn title_of(options: &[SelectOption], value: &Value) -> Option<String> {
    options
        .iter()
        .find(|opt| &opt.value == value)
        .map(|opt| opt.title.clone())
}

/// Render a stored select value as option titles. Multiple values render
/// as titles sorted ascending, one per line with trailing commas; values
/// without a matching option render empty.
pub(crate) fn render(settings: &SelectSettings, value: &Value) -> String {
    if settings.multiple {
        let mut titles: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| title_of(&settings.options, v))
                .collect(),
            _ => Vec::new(),
        };
        titles.sort();
        titles.join(",\n")
    } else {
        title_of(&settings.options, value).unwrap_or_default()
    }
}

/// Filter semantics: multi-value fields match containment, single-value
/// fields match exactly (or any of a list when `filter_multiple` is set).
pub(crate) fn filter(query: &mut ItemQuery, settings: &SelectSettings, name: &str, value: &Value) {
    if settings.multiple {
        query.push(Predicate::FieldContains {
            name: name.to_string(),
            value: value.clone(),
        });
    } else if settings.filter_multiple {
        query.push(Predicate::FieldIn {
            name: name.to_string(),
            values: as_array(value.clone()),
        });
    } else {
        query.push(Predicate::FieldEquals {
            name: name.to_string(),
            value: value.clone(),
        });
    }
}

/// Choice from a config-declared option list.
pub struct SelectType;

impl FieldType for SelectType {
    fn shape_config(&self, raw: &RawFieldConfig, _lookups: &Lookups) -> Result<TypeOptions> {
        let options = raw.options.clone().ok_or_else(|| {
            DynaformError::invalid_config(&raw.name, "select field requires options")
        })?;
        Ok(TypeOptions::Select(shape_settings(raw, options)))
    }

    fn normalize(&self, config: &FieldConfig, value: Value, _ctx: &crate::context::FormContext) -> Value {
        match config.options.select() {
            Some(settings) => coerce(settings, value),
            None => value,
        }
    }

    fn render_text(&self, field: &Field, source: ValueSource, _form: &Form) -> String {
        match field.config().options.select() {
            Some(settings) => render(settings, field.source_data(source)),
            None => String::new(),
        }
    }

    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, _form: &Form) {
        if let Some(settings) = config.options.select() {
            filter(query, settings, &config.name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(multiple: bool) -> SelectSettings {
        SelectSettings {
            options: vec![
                SelectOption::new("B", json!(1)),
                SelectOption::new("A", json!(2)),
            ],
            multiple,
            filter_multiple: false,
        }
    }

    #[test]
    fn coerce_single_takes_first_of_list() {
        let s = settings(false);
        assert_eq!(coerce(&s, json!([1, 2])), json!(1));
        assert_eq!(coerce(&s, json!([])), json!(""));
        assert_eq!(coerce(&s, json!(2)), json!(2));
    }

    #[test]
    fn coerce_multiple_wraps_scalar() {
        let s = settings(true);
        assert_eq!(coerce(&s, json!(1)), json!([1]));
        assert_eq!(coerce(&s, json!(null)), json!([]));
        assert_eq!(coerce(&s, json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn render_multiple_sorts_titles() {
        let s = settings(true);
        assert_eq!(render(&s, &json!([1, 2])), "A,\nB");
        assert_eq!(render(&s, &json!([2])), "A");
        assert_eq!(render(&s, &json!([99])), "");
    }

    #[test]
    fn render_single_matches_value_exactly() {
        let s = settings(false);
        assert_eq!(render(&s, &json!(2)), "A");
        // "2" is not 2: stored values match options by exact JSON equality
        assert_eq!(render(&s, &json!("2")), "");
    }

    #[test]
    fn filter_shape_follows_settings() {
        let mut q = ItemQuery::new();
        filter(&mut q, &settings(true), "tags", &json!(1));
        assert!(matches!(q.predicates()[0], Predicate::FieldContains { .. }));

        let mut q = ItemQuery::new();
        filter(&mut q, &settings(false), "status", &json!(1));
        assert!(matches!(q.predicates()[0], Predicate::FieldEquals { .. }));

        let mut q = ItemQuery::new();
        let mut s = settings(false);
        s.filter_multiple = true;
        filter(&mut q, &s, "status", &json!([1, 2]));
        assert!(matches!(q.predicates()[0], Predicate::FieldIn { .. }));
    }
}
