//! Storage contracts for the dynaform record engine.
//!
//! `dynaform-store` is a standalone, persistence-only crate. It knows
//! nothing about field types, validation or forms. It defines the
//! adapter traits the engine talks to ([`RecordStore`], [`FieldStore`],
//! [`ActionStore`]), the query/predicate model field types compile their
//! filters into, typed identifiers, and an in-memory reference
//! implementation used for tests.
//!
//! # Architecture
//!
//! - **Contracts first**: the engine depends on traits, never a backend
//! - **Predicates as data**: filters travel as a closed [`Predicate`] enum
//! - **Atomic commits**: `ItemRecord::save`/`delete` commit the record and
//!   its field rows in one step, or not at all

pub mod error;
pub mod ids;
pub mod memory;
pub mod query;
pub mod record;

pub use error::{Result, StoreError};
pub use ids::{ActionId, FieldRowId, ItemId, UserId};
pub use memory::{MemoryRecord, MemoryStore};
pub use query::{ActionQuery, FieldQuery, ItemQuery, Predicate};
pub use record::{
    ActionRecord, ActionStore, ChangeKind, FieldRow, FieldStore, ItemRecord, RecordStore,
};
