//! Datetime fields.
//!
//! Values store as naive `YYYY-MM-DD HH:MM:SS` strings in the request
//! timezone, which keeps range filters a lexicographic comparison. Fields
//! with `showTime` disabled clamp to midnight and render the date only.

use crate::config::{FieldConfig, RawFieldConfig, TypeOptions};
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::form::Form;
use crate::lookup::Lookups;
use crate::registry::{FieldType, ValueSource};
use crate::value::{is_empty_value, value_text};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use dynaform_store::{ItemQuery, Predicate};
use serde::Deserialize;
use serde_json::Value;

/// Storage format for datetime values
pub const STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DISPLAY_DATE: &str = "%d.%m.%Y";

pub(crate) fn parse_local(text: &str, tz: FixedOffset) -> Option<NaiveDateTime> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&tz).naive_local());
    }
    for format in [STORE_FORMAT, "%d.%m.%Y %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in ["%Y-%m-%d", DISPLAY_DATE] {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return Some(parsed.and_hms_opt(0, 0, 0).expect("midnight is valid"));
        }
    }
    None
}

fn clamp(parsed: NaiveDateTime, show_time: bool) -> NaiveDateTime {
    if show_time {
        parsed
    } else {
        parsed.date().and_hms_opt(0, 0, 0).expect("midnight is valid")
    }
}

fn shows_time(config: &FieldConfig) -> bool {
    matches!(config.options, TypeOptions::Datetime { show_time: true })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RangeInput {
    from: Option<String>,
    to: Option<String>,
}

/// Date or date-and-time field.
pub struct DatetimeType;

impl FieldType for DatetimeType {
    fn shape_config(&self, raw: &RawFieldConfig, _lookups: &Lookups) -> Result<TypeOptions> {
        Ok(TypeOptions::Datetime {
            show_time: raw.show_time.unwrap_or(true),
        })
    }

    /// Loaded values reformat when they parse and pass through unchanged
    /// when they do not. Rejection happens in `apply_change` only.
    fn normalize(&self, config: &FieldConfig, value: Value, ctx: &crate::context::FormContext) -> Value {
        if is_empty_value(&value) {
            return Value::String(String::new());
        }
        let text = value_text(&value);
        match parse_local(&text, ctx.timezone()) {
            Some(parsed) => Value::String(
                clamp(parsed, shows_time(config)).format(STORE_FORMAT).to_string(),
            ),
            None => value,
        }
    }

    fn apply_change(
        &self,
        field: &mut Field,
        value: Value,
        ctx: &crate::context::FormContext,
    ) -> Result<()> {
        if is_empty_value(&value) {
            field.set_data(Value::String(String::new()));
            return Ok(());
        }
        let text = value_text(&value);
        let parsed = parse_local(&text, ctx.timezone()).ok_or_else(|| {
            DynaformError::invalid_input(field.name(), format!("unparseable datetime: {text}"))
        })?;
        let stored = clamp(parsed, shows_time(field.config()))
            .format(STORE_FORMAT)
            .to_string();
        field.set_data(Value::String(stored));
        Ok(())
    }

    fn render_text(&self, field: &Field, source: ValueSource, _form: &Form) -> String {
        let text = value_text(field.source_data(source));
        if text.is_empty() {
            return text;
        }
        match NaiveDateTime::parse_from_str(&text, STORE_FORMAT) {
            Ok(parsed) => {
                if shows_time(field.config()) {
                    parsed.format("%d.%m.%Y %H:%M:%S").to_string()
                } else {
                    parsed.format(DISPLAY_DATE).to_string()
                }
            }
            Err(_) => text,
        }
    }

    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, form: &Form) {
        let range: RangeInput = match serde_json::from_value(value.clone()) {
            Ok(range) => range,
            Err(_) => return,
        };
        let tz = form.context().timezone();
        let show_time = shows_time(config);
        let bound = |text: &Option<String>| {
            text.as_deref()
                .and_then(|t| parse_local(t, tz))
                .map(|p| clamp(p, show_time).format(STORE_FORMAT).to_string())
        };
        let (from, to) = (bound(&range.from), bound(&range.to));
        if from.is_none() && to.is_none() {
            return;
        }
        query.push(Predicate::FieldRange {
            name: config.name.clone(),
            from,
            to,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(show_time: bool) -> FieldConfig {
        FieldConfig {
            name: "due".to_string(),
            title: "Due".to_string(),
            type_id: "datetime".to_string(),
            visible: true,
            tag: None,
            valid_rules: Vec::new(),
            edit_rules: crate::config::EditRuleSpec::default(),
            sortable: true,
            filterable: true,
            options: TypeOptions::Datetime { show_time },
            descriptor: "datetime".to_string(),
        }
    }

    fn ctx() -> crate::context::FormContext {
        crate::context::FormContext::default()
    }

    #[test]
    fn normalize_clamps_without_time() {
        let v = DatetimeType.normalize(&config(false), json!("2024-03-05 14:30:00"), &ctx());
        assert_eq!(v, json!("2024-03-05 00:00:00"));
    }

    #[test]
    fn normalize_keeps_time_when_shown() {
        let v = DatetimeType.normalize(&config(true), json!("05.03.2024 14:30:00"), &ctx());
        assert_eq!(v, json!("2024-03-05 14:30:00"));
    }

    #[test]
    fn normalize_passes_unparseable_through() {
        let v = DatetimeType.normalize(&config(true), json!("soon"), &ctx());
        assert_eq!(v, json!("soon"));
    }

    #[test]
    fn normalize_converts_instants_to_the_context_timezone() {
        let ctx = ctx().with_timezone(FixedOffset::east_opt(3 * 3600).unwrap());
        let v = DatetimeType.normalize(&config(true), json!("2024-03-05T21:30:00Z"), &ctx);
        assert_eq!(v, json!("2024-03-06 00:30:00"));
    }

    #[test]
    fn parse_accepts_rfc3339_with_offset() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let parsed = parse_local("2024-03-05T21:30:00Z", tz).unwrap();
        assert_eq!(parsed.format(STORE_FORMAT).to_string(), "2024-03-06 00:30:00");
    }

    #[test]
    fn parse_accepts_bare_date() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let parsed = parse_local("05.03.2024", tz).unwrap();
        assert_eq!(parsed.format(STORE_FORMAT).to_string(), "2024-03-05 00:00:00");
    }
}
