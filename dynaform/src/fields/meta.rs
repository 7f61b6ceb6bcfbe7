//! Meta fields: values derived from the record, never written back.
//!
//! `itemCreated` surfaces the creation timestamp, `itemUser` the owning
//! user's name. Both are read-only, skipped by validation and saving, and
//! their incoming changes are ignored rather than rejected.

use crate::config::{FieldConfig, RawFieldConfig, TypeOptions};
use crate::error::Result;
use crate::field::Field;
use crate::fields::datetime::parse_local;
use crate::form::Form;
use crate::item::ItemMeta;
use crate::lookup::Lookups;
use crate::registry::{FieldType, ValueSource};
use crate::value::{as_array, value_text};
use chrono::{LocalResult, TimeZone, Utc};
use dynaform_store::{ItemQuery, Predicate, UserId};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RangeInput {
    from: Option<String>,
    to: Option<String>,
}

/// Creation timestamp of the item, formatted for display.
pub struct ItemCreatedType;

impl FieldType for ItemCreatedType {
    fn shape_config(&self, _raw: &RawFieldConfig, _lookups: &Lookups) -> Result<TypeOptions> {
        Ok(TypeOptions::Created)
    }

    fn attach(&self, field: &mut Field, meta: &ItemMeta) {
        field.set_data(Value::String(meta.created_text.clone()));
    }

    fn render_text(&self, field: &Field, _source: ValueSource, _form: &Form) -> String {
        // both sources read the attached display text
        value_text(field.source_data(ValueSource::Pending))
    }

    fn build_filter(&self, query: &mut ItemQuery, _config: &FieldConfig, value: &Value, form: &Form) {
        let range: RangeInput = match serde_json::from_value(value.clone()) {
            Ok(range) => range,
            Err(_) => return,
        };
        let tz = form.context().timezone();
        let bound = |text: &Option<String>| {
            let parsed = text.as_deref().and_then(|t| parse_local(t, tz))?;
            match tz.from_local_datetime(&parsed) {
                LocalResult::Single(instant) => Some(instant.with_timezone(&Utc)),
                _ => None,
            }
        };
        let (from, to) = (bound(&range.from), bound(&range.to));
        if from.is_none() && to.is_none() {
            return;
        }
        query.push(Predicate::CreatedRange { from, to });
    }

    fn sortable(&self) -> bool {
        false
    }

    fn is_meta(&self) -> bool {
        true
    }
}

/// Name of the user who created the item.
pub struct ItemUserType;

impl FieldType for ItemUserType {
    fn shape_config(&self, raw: &RawFieldConfig, lookups: &Lookups) -> Result<TypeOptions> {
        Ok(TypeOptions::User {
            on_filter_select: raw.on_filter_select.unwrap_or(false),
            options: lookups.users.options(),
        })
    }

    fn attach(&self, field: &mut Field, meta: &ItemMeta) {
        field.set_data(Value::String(meta.user_name.clone()));
    }

    fn build_filter(&self, query: &mut ItemQuery, config: &FieldConfig, value: &Value, _form: &Form) {
        let (on_filter_select, options) = match &config.options {
            TypeOptions::User {
                on_filter_select,
                options,
            } => (*on_filter_select, options),
            _ => return,
        };
        let users: Vec<UserId> = if on_filter_select {
            // filter value is a list of user ids picked from the options
            as_array(value.clone())
                .iter()
                .map(|v| UserId::from_string(value_text(v)))
                .collect()
        } else {
            // filter value is a name fragment, resolved against the
            // directory so the store only ever sees owner ids
            let needle = value_text(value).to_lowercase();
            options
                .iter()
                .filter(|opt| opt.title.to_lowercase().contains(&needle))
                .map(|opt| UserId::from_string(value_text(&opt.value)))
                .collect()
        };
        query.push(Predicate::OwnerIn { users });
    }

    fn sortable(&self) -> bool {
        false
    }

    fn is_meta(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::SelectOption;
    use serde_json::json;

    fn user_config(on_filter_select: bool) -> FieldConfig {
        FieldConfig {
            name: "author".to_string(),
            title: "Author".to_string(),
            type_id: "itemUser".to_string(),
            visible: true,
            tag: None,
            valid_rules: Vec::new(),
            edit_rules: crate::config::EditRuleSpec::default(),
            sortable: false,
            filterable: true,
            options: TypeOptions::User {
                on_filter_select,
                options: vec![
                    SelectOption::new("Ann Smith", json!("u1")),
                    SelectOption::new("Bob Stone", json!("u2")),
                ],
            },
            descriptor: "itemUser".to_string(),
        }
    }

    fn owners(query: &ItemQuery) -> Vec<String> {
        match &query.predicates()[0] {
            Predicate::OwnerIn { users } => users.iter().map(|u| u.to_string()).collect(),
            other => panic!("expected OwnerIn, got {other:?}"),
        }
    }

    #[test]
    fn name_filter_resolves_to_owner_ids() {
        let form = crate::form::Form::builder(Vec::new()).build().unwrap();
        let mut query = ItemQuery::new();
        ItemUserType.build_filter(&mut query, &user_config(false), &json!("smith"), &form);
        assert_eq!(owners(&query), ["u1"]);
    }

    #[test]
    fn unmatched_name_constrains_to_nothing() {
        let form = crate::form::Form::builder(Vec::new()).build().unwrap();
        let mut query = ItemQuery::new();
        ItemUserType.build_filter(&mut query, &user_config(false), &json!("nobody"), &form);
        assert!(owners(&query).is_empty());
    }

    #[test]
    fn select_mode_takes_ids_directly() {
        let form = crate::form::Form::builder(Vec::new()).build().unwrap();
        let mut query = ItemQuery::new();
        ItemUserType.build_filter(&mut query, &user_config(true), &json!(["u2"]), &form);
        assert_eq!(owners(&query), ["u2"]);
    }
}
