//! Built-in field type implementations.

mod catalog;
mod datetime;
mod divisions;
mod files;
mod meta;
mod plain;
mod select;

pub use catalog::CatalogType;
pub use datetime::DatetimeType;
pub use divisions::DivisionsType;
pub use files::FilesType;
pub use meta::{ItemCreatedType, ItemUserType};
pub use plain::PlainType;
pub use select::SelectType;
