//! File attachment fields.
//!
//! The engine stores file ids only; upload and download happen against the
//! configured routes outside the engine, and display names come from the
//! file lookup.

use crate::config::{RawFieldConfig, TypeOptions};
use crate::error::{DynaformError, Result};
use crate::field::Field;
use crate::form::Form;
use crate::lookup::Lookups;
use crate::registry::{FieldType, ValueSource};
use crate::value::as_array;
use serde_json::Value;

/// List of attached file ids.
pub struct FilesType;

impl FieldType for FilesType {
    fn shape_config(&self, raw: &RawFieldConfig, _lookups: &Lookups) -> Result<TypeOptions> {
        let upload_route = raw.upload_route.clone().ok_or_else(|| {
            DynaformError::invalid_config(&raw.name, "files field requires uploadRoute")
        })?;
        let download_route = raw.download_route.clone().ok_or_else(|| {
            DynaformError::invalid_config(&raw.name, "files field requires downloadRoute")
        })?;
        Ok(TypeOptions::Files {
            upload_route,
            download_route,
        })
    }

    fn normalize(
        &self,
        _config: &crate::config::FieldConfig,
        value: Value,
        _ctx: &crate::context::FormContext,
    ) -> Value {
        Value::Array(as_array(value))
    }

    fn render_text(&self, field: &Field, source: ValueSource, form: &Form) -> String {
        let ids = match field.source_data(source) {
            Value::Array(items) => items.as_slice(),
            _ => &[],
        };
        form.lookups()
            .files
            .by_ids(ids)
            .into_iter()
            .map(|file| file.name)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
