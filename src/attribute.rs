// Copyright 2026 Schoolyard Software, LLC.

//! Declarative attribute metadata for school objects
//!
//! Every concrete kind owns a static table of [`AttributeDescriptor`]s.
//! Descriptors are immutable class-level metadata: they say how a field
//! is labelled, whether it is required, which directory attribute it
//! maps to, and which syntax check applies to its values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A value held by a school-object attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// No value set
    Null,
    /// Single string value
    Text(String),
    /// Multi-valued attribute
    Items(Vec<String>),
    /// Boolean flag (mapped to the directory as `0`/`1`)
    Flag(bool),
}

impl AttributeValue {
    /// Build a text value
    pub fn text(value: impl Into<String>) -> Self {
        AttributeValue::Text(value.into())
    }

    /// Build a multi-value from anything iterable over strings
    pub fn items<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeValue::Items(values.into_iter().map(Into::into).collect())
    }

    /// Whether no usable value is present
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Text(s) => s.is_empty(),
            AttributeValue::Items(v) => v.is_empty(),
            AttributeValue::Flag(_) => false,
        }
    }

    /// The single string value, if this is a non-empty text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// All string values (a text value yields one item)
    pub fn as_items(&self) -> Vec<String> {
        match self {
            AttributeValue::Null => Vec::new(),
            AttributeValue::Text(s) if s.is_empty() => Vec::new(),
            AttributeValue::Text(s) => vec![s.clone()],
            AttributeValue::Items(v) => v.clone(),
            AttributeValue::Flag(b) => vec![if *b { "1" } else { "0" }.to_string()],
        }
    }

    /// Build a value back from directory attribute values
    pub fn from_directory(values: &[String], multi_valued: bool) -> Self {
        if values.is_empty() {
            AttributeValue::Null
        } else if multi_valued {
            AttributeValue::Items(values.to_vec())
        } else {
            AttributeValue::Text(values[0].clone())
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

static COMMON_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]*$").unwrap());
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9._-]*$").unwrap());
static SCHOOL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static HOST_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$").unwrap());
/// Shape of a `role:context_type:context` string
pub static ROLE_STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:]+:[^:]+:[^:]+$").unwrap());

/// Validation syntax attached to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syntax {
    /// No check beyond required-ness
    Plain,
    /// Directory common name: letters, digits, spaces, `._-`
    CommonName,
    /// Login name: lowercase, starts with a letter
    Username,
    /// School (OU) name: letters, digits and dashes, no spaces
    SchoolName,
    /// E-mail address
    Email,
    /// ISO date `YYYY-MM-DD`
    Date,
    /// Host name label
    HostName,
    /// Role string `role:context_type:context`
    RoleString,
}

impl Syntax {
    fn check_one(&self, value: &str) -> Result<(), String> {
        let ok = match self {
            Syntax::Plain => true,
            Syntax::CommonName => COMMON_NAME_RE.is_match(value) && !value.ends_with(' '),
            Syntax::Username => USERNAME_RE.is_match(value),
            Syntax::SchoolName => SCHOOL_NAME_RE.is_match(value),
            Syntax::Email => EMAIL_RE.is_match(value),
            Syntax::Date => DATE_RE.is_match(value),
            Syntax::HostName => HOST_NAME_RE.is_match(value),
            Syntax::RoleString => ROLE_STRING_RE.is_match(value),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("value \"{value}\" does not match syntax {self:?}"))
        }
    }

    /// Check every string held by a value against this syntax
    pub fn check(&self, value: &AttributeValue) -> Result<(), String> {
        for item in value.as_items() {
            self.check_one(&item)?;
        }
        Ok(())
    }
}

/// Declarative field definition, owned by the kind, not by instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute name on the school object
    pub name: &'static str,
    /// Human-readable label used in validation messages
    pub label: &'static str,
    /// Directory attribute this field maps to, if it is persisted
    pub directory_name: Option<&'static str>,
    /// Whether a value must be present for validation to pass
    pub required: bool,
    /// Changes to this field raise a warning when the object already exists
    pub unlikely_to_change: bool,
    /// Internal fields are excluded from `to_json`
    pub internal: bool,
    /// Whether the field holds multiple values
    pub multi_valued: bool,
    /// Whether the field participates in easy-filter searches
    pub searchable: bool,
    /// Validation syntax
    pub syntax: Syntax,
}

impl AttributeDescriptor {
    /// New optional plain attribute without a directory mapping
    pub const fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            directory_name: None,
            required: false,
            unlikely_to_change: false,
            internal: false,
            multi_valued: false,
            searchable: false,
            syntax: Syntax::Plain,
        }
    }

    /// Set the directory attribute this field maps to
    pub const fn directory(mut self, name: &'static str) -> Self {
        self.directory_name = Some(name);
        self
    }

    /// Mark the field required
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark changes to the field as unlikely (warning on change)
    pub const fn unlikely_to_change(mut self) -> Self {
        self.unlikely_to_change = true;
        self
    }

    /// Exclude the field from JSON output
    pub const fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Mark the field multi-valued
    pub const fn multi(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Include the field in easy-filter searches
    pub const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Attach a validation syntax
    pub const fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Validate a value against required-ness and syntax
    pub fn validate(&self, value: &AttributeValue) -> Result<(), String> {
        if value.is_empty() {
            if self.required {
                return Err(format!("{} is required", self.label));
            }
            return Ok(());
        }
        self.syntax.check(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("t1", Syntax::Username => true; "plain login name")]
    #[test_case("T1", Syntax::Username => false; "uppercase login rejected")]
    #[test_case("1a", Syntax::Username => false; "digit start rejected")]
    #[test_case("Alpha-1", Syntax::SchoolName => true; "school with dash")]
    #[test_case("Alpha One", Syntax::SchoolName => false; "school with space rejected")]
    #[test_case("Room 12", Syntax::CommonName => true; "cn with space")]
    #[test_case(",bad", Syntax::CommonName => false; "cn with comma rejected")]
    #[test_case("2004-05-17", Syntax::Date => true; "iso date")]
    #[test_case("17.05.2004", Syntax::Date => false; "german date rejected")]
    #[test_case("teacher:school:Alpha", Syntax::RoleString => true; "role string")]
    #[test_case("teacher-Alpha", Syntax::RoleString => false; "role string needs two colons")]
    fn syntax_checks(value: &str, syntax: Syntax) -> bool {
        syntax.check_one(value).is_ok()
    }

    #[test]
    fn required_attribute_rejects_empty_value() {
        let desc = AttributeDescriptor::new("name", "Name").required();
        assert!(desc.validate(&AttributeValue::Null).is_err());
        assert!(desc.validate(&AttributeValue::text("x")).is_ok());
    }

    #[test]
    fn optional_attribute_accepts_empty_value() {
        let desc = AttributeDescriptor::new("description", "Description");
        assert!(desc.validate(&AttributeValue::Null).is_ok());
    }

    #[test]
    fn multi_value_checks_every_item() {
        let desc = AttributeDescriptor::new("roles", "Roles")
            .multi()
            .syntax(Syntax::RoleString);
        let good = AttributeValue::items(["teacher:school:Alpha", "staff:school:Beta"]);
        let bad = AttributeValue::items(["teacher:school:Alpha", "nonsense"]);
        assert!(desc.validate(&good).is_ok());
        assert!(desc.validate(&bad).is_err());
    }

    #[test]
    fn flag_maps_to_directory_digits() {
        assert_eq!(AttributeValue::Flag(true).as_items(), vec!["1"]);
        assert_eq!(AttributeValue::Flag(false).as_items(), vec!["0"]);
    }
}
