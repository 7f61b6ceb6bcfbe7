//! Plain fields: `text`, `textarea` and `int` share the default behavior.

use crate::config::{RawFieldConfig, TypeOptions};
use crate::error::Result;
use crate::lookup::Lookups;
use crate::registry::FieldType;

/// Scalar field with no per-type settings. Values store as given, render
/// via plain stringification, and filter by substring match.
pub struct PlainType;

impl FieldType for PlainType {
    fn shape_config(&self, _raw: &RawFieldConfig, _lookups: &Lookups) -> Result<TypeOptions> {
        Ok(TypeOptions::Plain)
    }
}
