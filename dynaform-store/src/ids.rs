//! Typed identifiers for records, field rows, actions and users.
//!
//! All ids are ULID strings behind newtypes so they cannot be mixed up at
//! call sites. `new()` mints a fresh ULID; `from_string()` wraps an
//! existing id (e.g. one handed over by an external store).

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a new unique id
            pub fn new() -> Self {
                Self(Ulid::new().to_string())
            }

            /// Wrap an existing id string
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// The id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one item (record)
    ItemId
);
define_id!(
    /// Identifies one persisted field row
    FieldRowId
);
define_id!(
    /// Identifies one audit action
    ActionId
);
define_id!(
    /// Identifies a user
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
    }

    #[test]
    fn id_round_trips_through_serde() {
        let id = ActionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ActionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_wraps_existing_string() {
        let id = UserId::from_string("u-42");
        assert_eq!(id.as_str(), "u-42");
        assert_eq!(id.to_string(), "u-42");
    }
}
