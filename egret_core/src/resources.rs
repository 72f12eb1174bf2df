//! Type-safe resource identifiers and resource definitions.
//!
//! Index and field names are validated newtypes so that the two cannot be
//! mixed up and a field always knows the index it belongs to.

use std::{fmt, sync::Arc};

use snafu::Snafu;

/// Errors that can occur when parsing resource names.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ResourceError {
    #[snafu(display(
        "invalid resource id: '{id}' - must be at least 1 character long, start with a lowercase letter, and contain only lowercase letters, numbers, hyphens, and underscores"
    ))]
    InvalidResourceId { id: String },
}

pub type ResourceResult<T, E = ResourceError> = ::std::result::Result<T, E>;

/// Validate a resource ID according to Egret naming conventions.
///
/// Valid resource IDs must:
/// - Be at least 1 character long
/// - Start with a lowercase letter [a-z]
/// - Contain only lowercase letters, numbers, hyphens (-), and underscores (_)
pub fn validate_resource_id(id: &str) -> ResourceResult<()> {
    let mut chars = id.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return Err(ResourceError::InvalidResourceId { id: id.to_string() }),
    }

    for ch in chars {
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' && ch != '_' {
            return Err(ResourceError::InvalidResourceId { id: id.to_string() });
        }
    }

    Ok(())
}

/// Type-safe identifier for an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexName {
    id: String,
}

impl IndexName {
    /// Create a new index identifier.
    pub fn new(id: impl Into<String>) -> ResourceResult<Self> {
        let id = id.into();
        validate_resource_id(&id)?;
        Ok(Self { id })
    }

    /// Create a new index identifier without validation.
    ///
    /// # Panics
    ///
    /// Panics if the resource ID is invalid.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        let id = id.into();
        validate_resource_id(&id).expect("resource id must be valid");
        Self { id }
    }

    /// Get the resource ID.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "indexes/{}", self.id)
    }
}

/// Type-safe identifier for a field belonging to an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldName {
    id: String,
    parent: IndexName,
}

impl FieldName {
    /// Create a new field identifier.
    pub fn new(id: impl Into<String>, parent: IndexName) -> ResourceResult<Self> {
        let id = id.into();
        validate_resource_id(&id)?;
        Ok(Self { id, parent })
    }

    /// Create a new field identifier without validation.
    ///
    /// # Panics
    ///
    /// Panics if the resource ID is invalid.
    pub fn new_unchecked(id: impl Into<String>, parent: IndexName) -> Self {
        let id = id.into();
        validate_resource_id(&id).expect("resource id must be valid");
        Self { id, parent }
    }

    /// Get the resource ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the parent index identifier.
    pub fn parent(&self) -> &IndexName {
        &self.parent
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/fields/{}", self.parent, self.id)
    }
}

/// An index on the cluster.
///
/// An index groups fields that share the same column space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// The index name.
    pub name: IndexName,
    /// Whether columns are addressed by string keys instead of numeric IDs.
    pub keys: bool,
}

pub type IndexRef = Arc<Index>;

impl Index {
    /// Create a new index with the given name and options.
    pub fn new(name: IndexName, options: IndexOptions) -> Self {
        Self {
            name,
            keys: options.keys,
        }
    }
}

/// Options for creating an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Whether columns are addressed by string keys instead of numeric IDs.
    pub keys: bool,
}

impl IndexOptions {
    /// Create new index options with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change whether the index uses string column keys.
    pub fn with_keys(mut self, keys: bool) -> Self {
        self.keys = keys;
        self
    }
}

/// The kind of data a field stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldKind {
    /// The field stores row/column set bits.
    #[default]
    Set,
    /// The field stores a signed integer value per column.
    Int,
}

/// A field belonging to an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field name.
    pub name: FieldName,
    /// The kind of data the field stores.
    pub kind: FieldKind,
    /// Whether rows are addressed by string keys instead of numeric IDs.
    pub keys: bool,
}

pub type FieldRef = Arc<Field>;

impl Field {
    /// Create a new field with the given name and options.
    pub fn new(name: FieldName, options: FieldOptions) -> Self {
        Self {
            name,
            kind: options.kind,
            keys: options.keys,
        }
    }
}

/// Options for creating a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// The kind of data the field stores.
    pub kind: FieldKind,
    /// Whether rows are addressed by string keys instead of numeric IDs.
    pub keys: bool,
}

impl FieldOptions {
    /// Create new field options with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the kind of data the field stores.
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Change whether the field uses string row keys.
    pub fn with_keys(mut self, keys: bool) -> Self {
        self.keys = keys;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let index_name = IndexName::new("repository").unwrap();
        let field_name = FieldName::new("stargazer", index_name.clone()).unwrap();
        let field = Field::new(field_name.clone(), FieldOptions::new().with_keys(true));

        assert_eq!(field.name, field_name);
        assert_eq!(field.name.id(), "stargazer");
        assert_eq!(field.name.parent(), &index_name);
        assert_eq!(
            field.name.to_string(),
            "indexes/repository/fields/stargazer"
        );
        assert_eq!(field.kind, FieldKind::Set);
        assert!(field.keys);
    }

    #[test]
    fn test_invalid_resource_ids() {
        assert!(IndexName::new("").is_err());
        assert!(IndexName::new("Uppercase").is_err());
        assert!(IndexName::new("1-leading-digit").is_err());
        assert!(IndexName::new("has space").is_err());
        assert!(IndexName::new("ok-name_2").is_ok());
    }

    #[test]
    #[should_panic(expected = "resource id must be valid")]
    fn test_new_unchecked_panics_on_invalid_id() {
        IndexName::new_unchecked("Not Valid");
    }
}
