// Copyright 2026 Schoolyard Software, LLC.

//! Error types for directory domain operations

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Errors raised by the directory collaborator.
///
/// The lifecycle engine never wraps or retries these; they pass through
/// unmodified so callers can apply their own retry policy.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// No entry exists at the given DN
    #[error("no such entry: {dn}")]
    NoSuchEntry {
        /// DN that was looked up
        dn: String,
    },

    /// An entry already exists at the given DN
    #[error("entry already exists: {dn}")]
    AlreadyExists {
        /// DN of the conflicting entry
        dn: String,
    },

    /// A DN could not be parsed
    #[error("invalid DN: {dn}")]
    InvalidDn {
        /// The offending DN string
        dn: String,
    },

    /// A search filter could not be parsed
    #[error("invalid filter: {filter}")]
    InvalidFilter {
        /// The offending filter string
        filter: String,
    },

    /// The parent container of a new entry does not exist
    #[error("missing parent container for {dn}")]
    MissingParent {
        /// DN whose parent is absent
        dn: String,
    },

    /// The connection to the directory failed
    #[error("directory connection error: {0}")]
    Connection(String),

    /// The directory refused the operation
    #[error("permission denied on {dn}")]
    PermissionDenied {
        /// DN the operation targeted
        dn: String,
    },

    /// A non-recursive delete hit an entry with children
    #[error("entry {dn} has children")]
    NotLeaf {
        /// DN of the non-leaf entry
        dn: String,
    },
}

/// Validation failure carrying the full attribute -> messages mapping.
///
/// Raised by write operations when `validate()` left errors behind; the
/// per-field structure is preserved so callers can render field-level
/// feedback.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Attribute name -> error messages
    pub errors: IndexMap<String, Vec<String>>,
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Create a validation error from an attribute -> messages mapping
    pub fn new(errors: IndexMap<String, Vec<String>>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (attribute, messages) in &self.errors {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}: {}", attribute, messages.join(". "))?;
        }
        Ok(())
    }
}

/// Errors that can occur in lifecycle operations on school objects
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// No object of the requested kind was found at the DN
    #[error("could not find object of kind {kind} with DN {dn}")]
    NoObject {
        /// Kind that was requested
        kind: &'static str,
        /// DN that was searched
        dn: String,
    },

    /// The entry does not correspond to any registered kind
    #[error("no model kind registered for entry {dn}")]
    UnknownModel {
        /// DN of the unresolvable entry
        dn: String,
    },

    /// The entry resolved to a kind incompatible with the requested one.
    ///
    /// Never coerced silently: letting one kind masquerade as another
    /// would be a security hole.
    #[error("{dn} is not a {expected} but a {actual}")]
    WrongModel {
        /// DN of the entry
        dn: String,
        /// Kind the caller asked for
        expected: &'static str,
        /// Kind the entry actually is
        actual: &'static str,
    },

    /// The entry at the DN does not match the kind's directory module
    #[error("wrong object type: {dn} is not a {expected}")]
    WrongObjectType {
        /// DN of the entry
        dn: String,
        /// Kind the caller asked for
        expected: &'static str,
    },

    /// A uniqueness assumption was violated; carries all matches
    #[error("expected at most one match for {filter}, found {}", matches.len())]
    MultipleObjects {
        /// Filter that produced the matches
        filter: String,
        /// DNs of all matching entries
        matches: Vec<String>,
    },

    /// Validation left errors behind; the write refused to proceed
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Directory/transport error, passed through unmodified
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// An in-process hook vetoed the operation
    #[error("hook {hook} rejected {operation}: {reason}")]
    HookVeto {
        /// Name of the vetoing hook
        hook: String,
        /// Operation that was rejected
        operation: &'static str,
        /// Reason given by the hook
        reason: String,
    },

    /// Generic engine error
    #[error("model error: {0}")]
    Generic(String),
}

/// Result type for lifecycle operations
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Create a generic model error
    pub fn generic(msg: impl Into<String>) -> Self {
        ModelError::Generic(msg.into())
    }

    /// Whether this error is a not-found condition.
    ///
    /// Kind mismatches count as "not found": a collection query asking
    /// for teachers must skip entries that turn out to be something
    /// else, not fail.
    pub fn is_no_object(&self) -> bool {
        matches!(
            self,
            ModelError::NoObject { .. }
                | ModelError::UnknownModel { .. }
                | ModelError::WrongModel { .. }
                | ModelError::WrongObjectType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_joins_fields() {
        let mut errors = IndexMap::new();
        errors.insert("name".to_string(), vec!["Name is required".to_string()]);
        errors.insert(
            "school".to_string(),
            vec!["The school \"x\" does not exist".to_string()],
        );
        let err = ValidationError::new(errors);
        let msg = err.to_string();
        assert!(msg.contains("name: Name is required"));
        assert!(msg.contains("school: The school"));
    }

    #[test]
    fn directory_errors_pass_through_model_error() {
        let err: ModelError = DirectoryError::NoSuchEntry {
            dn: "uid=x,dc=example,dc=org".to_string(),
        }
        .into();
        assert!(matches!(err, ModelError::Directory(_)));
    }

    #[test]
    fn no_object_is_recognized() {
        let err = ModelError::NoObject {
            kind: "Teacher",
            dn: "uid=t1,dc=example,dc=org".to_string(),
        };
        assert!(err.is_no_object());
        assert!(!ModelError::generic("boom").is_no_object());
    }
}
