//! Schema-driven record engine.
//!
//! A form is declared as an ordered list of field configs. Each config
//! names a field type (`text`, `select`, `datetime`, `files`, `divisions`,
//! `catalog`, `itemCreated`, `itemUser`, or a registered custom type),
//! validation rules and edit rules by name, and optional per-view
//! overrides. The form materializes items whose fields follow the config,
//! validates and locks them through the rule registries, commits record
//! and field rows atomically, and records per-field before/after text
//! diffs as an audit trail.
//!
//! ```
//! use dynaform::Form;
//! use serde_json::json;
//!
//! let entries = serde_json::from_value(json!([
//!     { "name": "title", "title": "Title", "type": "text", "validRules": ["required"] },
//!     { "name": "status", "title": "Status", "type": "select",
//!       "options": [ { "title": "Open", "value": 1 }, { "title": "Done", "value": 2 } ] },
//! ]))?;
//! let form = Form::builder(entries).build()?;
//!
//! let mut item = form.new_item()?;
//! item.change(serde_json::from_value(json!({
//!     "fields": [
//!         { "name": "title", "value": "First" },
//!         { "name": "status", "value": 1 },
//!     ]
//! }))?, &form)?;
//! assert!(item.save(&form)?);
//! assert_eq!(item.field("status").unwrap().value_text(), "Open");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod field;
pub mod fields;
pub mod form;
pub mod item;
pub mod lookup;
pub mod registry;
pub mod rules;

mod value;

pub use action::Action;
pub use config::{
    DivisionSettings, EditRuleSpec, FieldConfig, FormConfig, RawFieldConfig, SelectSettings,
    TypeOptions, ViewOverride,
};
pub use context::FormContext;
pub use error::{DynaformError, Result};
pub use event::{ActionRecorder, ChangeEvent, ChangeSink, FieldDiff, NullSink};
pub use field::Field;
pub use form::{Form, FormBuilder, ListParams, ACTIONS_PAGE_SIZE};
pub use item::{ChangeRequest, FieldErrors, FieldSeed, Item, ItemMeta, ItemPayload};
pub use lookup::{
    CatalogLookup, Division, DivisionCriteria, DivisionLookup, FileLookup, FileRef, Lookups,
    SelectOption, StaticUsers, UserLookup, UserRef,
};
pub use registry::{FieldType, FieldTypeRegistry, ValueSource};
pub use rules::{EditRule, Required, RuleScope, Unique, ValidRule};
