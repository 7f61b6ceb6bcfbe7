//! Collaborator lookups: reference data the engine reads but never owns.
//!
//! Catalogs, division trees, file metadata and user directories live in
//! other services. Field types reach them through these traits; the null
//! implementations keep tests and minimal deployments free of wiring.

use dynaform_store::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One selectable option: display title plus stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub title: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(title: impl Into<String>, value: Value) -> Self {
        Self {
            title: title.into(),
            value,
        }
    }
}

/// A user as the directory knows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

/// An uploaded file as the file service knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: Value,
    pub name: String,
}

/// One node of the division tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    pub id: Value,
    pub code: String,
    pub name: String,
}

/// Filter criteria over the division hierarchy. Each list narrows by one
/// level; empty lists do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DivisionCriteria {
    pub districts: Vec<Value>,
    pub affiliates: Vec<Value>,
    pub formats: Vec<Value>,
    pub subformats: Vec<Value>,
}

impl DivisionCriteria {
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
            && self.affiliates.is_empty()
            && self.formats.is_empty()
            && self.subformats.is_empty()
    }
}

/// Options source for catalog-backed selects.
pub trait CatalogLookup: Send + Sync {
    /// Options of one catalog category, titled by `title_field`
    fn options(&self, category_id: &Value, title_field: &str) -> crate::Result<Vec<SelectOption>>;
}

/// Division hierarchy access.
pub trait DivisionLookup: Send + Sync {
    fn districts(&self) -> Vec<SelectOption>;
    fn affiliates(&self) -> Vec<SelectOption>;
    fn formats(&self) -> Vec<SelectOption>;
    fn subformats(&self) -> Vec<SelectOption>;

    /// Resolve division ids to full nodes, unknown ids skipped
    fn by_ids(&self, ids: &[Value]) -> Vec<Division>;

    /// Ids of divisions matching the criteria
    fn matching(&self, criteria: &DivisionCriteria) -> Vec<Value>;
}

/// File metadata access.
pub trait FileLookup: Send + Sync {
    /// Resolve file ids to metadata, unknown ids skipped
    fn by_ids(&self, ids: &[Value]) -> Vec<FileRef>;
}

/// User directory access.
pub trait UserLookup: Send + Sync {
    fn find(&self, id: &UserId) -> Option<UserRef>;

    /// All users as select options, ordered by name
    fn options(&self) -> Vec<SelectOption>;
}

/// Catalog lookup with no categories.
#[derive(Debug, Default)]
pub struct NullCatalog;

impl CatalogLookup for NullCatalog {
    fn options(&self, _category_id: &Value, _title_field: &str) -> crate::Result<Vec<SelectOption>> {
        Ok(Vec::new())
    }
}

/// Division lookup with an empty tree.
#[derive(Debug, Default)]
pub struct NullDivisions;

impl DivisionLookup for NullDivisions {
    fn districts(&self) -> Vec<SelectOption> {
        Vec::new()
    }

    fn affiliates(&self) -> Vec<SelectOption> {
        Vec::new()
    }

    fn formats(&self) -> Vec<SelectOption> {
        Vec::new()
    }

    fn subformats(&self) -> Vec<SelectOption> {
        Vec::new()
    }

    fn by_ids(&self, _ids: &[Value]) -> Vec<Division> {
        Vec::new()
    }

    fn matching(&self, _criteria: &DivisionCriteria) -> Vec<Value> {
        Vec::new()
    }
}

/// File lookup that knows no files.
#[derive(Debug, Default)]
pub struct NullFiles;

impl FileLookup for NullFiles {
    fn by_ids(&self, _ids: &[Value]) -> Vec<FileRef> {
        Vec::new()
    }
}

/// Fixed in-memory user directory.
#[derive(Debug, Default)]
pub struct StaticUsers {
    users: Vec<UserRef>,
}

impl StaticUsers {
    pub fn new(users: Vec<UserRef>) -> Self {
        Self { users }
    }
}

impl UserLookup for StaticUsers {
    fn find(&self, id: &UserId) -> Option<UserRef> {
        self.users.iter().find(|u| &u.id == id).cloned()
    }

    fn options(&self) -> Vec<SelectOption> {
        let mut options: Vec<SelectOption> = self
            .users
            .iter()
            .map(|u| SelectOption::new(u.name.clone(), Value::String(u.id.to_string())))
            .collect();
        options.sort_by(|a, b| a.title.cmp(&b.title));
        options
    }
}

/// Bundle of all collaborator lookups a form carries.
#[derive(Clone)]
pub struct Lookups {
    pub catalog: Arc<dyn CatalogLookup>,
    pub divisions: Arc<dyn DivisionLookup>,
    pub files: Arc<dyn FileLookup>,
    pub users: Arc<dyn UserLookup>,
}

impl Default for Lookups {
    fn default() -> Self {
        Self {
            catalog: Arc::new(NullCatalog),
            divisions: Arc::new(NullDivisions),
            files: Arc::new(NullFiles),
            users: Arc::new(StaticUsers::default()),
        }
    }
}

impl std::fmt::Debug for Lookups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lookups").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_users_sorted_options() {
        let users = StaticUsers::new(vec![
            UserRef {
                id: UserId::from_string("u2"),
                name: "Zoe".to_string(),
            },
            UserRef {
                id: UserId::from_string("u1"),
                name: "Ann".to_string(),
            },
        ]);
        let options = users.options();
        assert_eq!(options[0].title, "Ann");
        assert_eq!(options[1].title, "Zoe");
        assert!(users.find(&UserId::from_string("u2")).is_some());
        assert!(users.find(&UserId::from_string("nope")).is_none());
    }

    #[test]
    fn criteria_emptiness() {
        let empty = DivisionCriteria::default();
        assert!(empty.is_empty());
        let filled: DivisionCriteria =
            serde_json::from_value(json!({ "districts": [1] })).unwrap();
        assert!(!filled.is_empty());
        assert_eq!(filled.districts, vec![json!(1)]);
    }
}
