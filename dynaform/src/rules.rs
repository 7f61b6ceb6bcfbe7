//! Validation and edit rules.
//!
//! Rules are registered by name on the form and referenced by name from
//! field config. Validation rules return messages (an empty list passes);
//! edit rules vote on editability and short-circuit on the first deny.

use crate::error::Result;
use crate::field::Field;
use crate::form::Form;
use crate::item::ItemMeta;
use crate::value::is_empty_value;
use dynaform_store::FieldQuery;

/// Context a rule runs in: the owning form and the item being worked on.
pub struct RuleScope<'a> {
    pub form: &'a Form,
    pub item: &'a ItemMeta,
}

/// A named validation rule. Returns the messages it produces for the
/// field; an empty list means the field passes.
pub trait ValidRule: Send + Sync {
    fn handle(&self, scope: &RuleScope<'_>, field: &Field) -> Result<Vec<String>>;
}

/// A named edit rule. `false` locks the field.
pub trait EditRule: Send + Sync {
    fn handle(&self, scope: &RuleScope<'_>, field: &Field) -> bool;
}

/// The field must carry a non-empty value.
pub struct Required;

impl ValidRule for Required {
    fn handle(&self, _scope: &RuleScope<'_>, field: &Field) -> Result<Vec<String>> {
        if is_empty_value(field.data()) {
            Ok(vec!["required".to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}

/// No other item may carry the same normalized value in this field.
///
/// The probe excludes the field's own persisted row, so re-saving an
/// unchanged value stays valid.
pub struct Unique;

impl ValidRule for Unique {
    fn handle(&self, scope: &RuleScope<'_>, field: &Field) -> Result<Vec<String>> {
        let mut query = FieldQuery::new(field.name(), field.data().clone())
            .excluding(field.row_id().cloned());
        scope.form.extend_field_query(&mut query);
        if scope.form.field_rows().duplicate_exists(&query)? {
            Ok(vec!["must be unique".to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}
