//! Static entity metadata.
//!
//! The filter compiler needs to answer three questions about an entity type: which
//! accessor reads a property, what type that accessor returns (to walk dotted paths), and
//! which markers the accessor carries (`ignore_case`, `embedded_id`). Entities describe
//! themselves once with a `static` [`EntityMetadata`] and expose it through [`LifeEntity`].
//!
//! ```
//! use lifeguard_dao::entity::{EntityMetadata, PropertyMeta};
//!
//! static PROFILE: EntityMetadata = EntityMetadata::new("Profile", "profiles", "id", &[
//!     PropertyMeta::basic("id", "id"),
//!     PropertyMeta::basic("city", "city").ignore_case(),
//! ]);
//!
//! static USER: EntityMetadata = EntityMetadata::new("User", "users", "id", &[
//!     PropertyMeta::basic("id", "id"),
//!     PropertyMeta::basic("name", "name"),
//!     PropertyMeta::association("profile", &PROFILE, "profile_id", "id"),
//! ]);
//!
//! assert!(USER.accessor("getProfile").is_ok());
//! assert_eq!(lifeguard_dao::entity::accessor_name("name"), "getName");
//! ```

use crate::executor::LifeError;
use may_postgres::Row;

/// How a property relates to the owning entity.
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    /// A plain column.
    Basic,
    /// A to-one association reachable through a join.
    Association {
        target: &'static EntityMetadata,
        /// Column on the owning table holding the foreign key.
        local_column: &'static str,
        /// Column on the target table the foreign key refers to.
        target_column: &'static str,
    },
    /// A component whose columns live on the owning table.
    Embedded { target: &'static EntityMetadata },
}

/// One readable property of an entity.
#[derive(Debug, Clone, Copy)]
pub struct PropertyMeta {
    pub name: &'static str,
    pub column: &'static str,
    /// Equality and LIKE predicates against this property compare case-insensitively.
    pub ignore_case: bool,
    /// The property is an embedded composite primary key.
    pub embedded_id: bool,
    pub kind: PropertyKind,
}

impl PropertyMeta {
    pub const fn basic(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            ignore_case: false,
            embedded_id: false,
            kind: PropertyKind::Basic,
        }
    }

    pub const fn association(
        name: &'static str,
        target: &'static EntityMetadata,
        local_column: &'static str,
        target_column: &'static str,
    ) -> Self {
        Self {
            name,
            column: local_column,
            ignore_case: false,
            embedded_id: false,
            kind: PropertyKind::Association {
                target,
                local_column,
                target_column,
            },
        }
    }

    pub const fn embedded(name: &'static str, target: &'static EntityMetadata) -> Self {
        Self {
            name,
            column: name,
            ignore_case: false,
            embedded_id: false,
            kind: PropertyKind::Embedded { target },
        }
    }

    /// An embedded component that is the entity's composite primary key.
    pub const fn embedded_id(name: &'static str, target: &'static EntityMetadata) -> Self {
        Self {
            embedded_id: true,
            ..Self::embedded(name, target)
        }
    }

    /// Mark the property for case-insensitive comparison.
    pub const fn ignore_case(self) -> Self {
        Self {
            ignore_case: true,
            ..self
        }
    }

    /// The metadata of the type this property's accessor returns, if it is not a scalar.
    pub fn return_type(&self) -> Option<&'static EntityMetadata> {
        match self.kind {
            PropertyKind::Basic => None,
            PropertyKind::Association { target, .. } | PropertyKind::Embedded { target } => {
                Some(target)
            }
        }
    }
}

/// Metadata describing an entity type and its table.
#[derive(Debug)]
pub struct EntityMetadata {
    pub name: &'static str,
    pub table: &'static str,
    pub id_property: &'static str,
    pub properties: &'static [PropertyMeta],
}

impl EntityMetadata {
    pub const fn new(
        name: &'static str,
        table: &'static str,
        id_property: &'static str,
        properties: &'static [PropertyMeta],
    ) -> Self {
        Self {
            name,
            table,
            id_property,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&'static PropertyMeta> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Locate the public no-argument accessor `method_name` (e.g. `getProfile`).
    ///
    /// # Errors
    ///
    /// Returns `LifeError::Reflection` when no property is read by that accessor.
    pub fn accessor(&self, method_name: &str) -> Result<&'static PropertyMeta, LifeError> {
        self.properties
            .iter()
            .find(|p| accessor_name(p.name) == method_name)
            .ok_or_else(|| {
                LifeError::Reflection(format!(
                    "no accessor {method_name}() on entity {}",
                    self.name
                ))
            })
    }
}

/// Name of the accessor reading `property`: `get` followed by the property name with its
/// first letter upper-cased.
pub fn accessor_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

/// Binds a Rust type to its entity metadata.
pub trait LifeEntity {
    fn metadata() -> &'static EntityMetadata;
}

/// Materialises a value from a PostgreSQL row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error>;
}
