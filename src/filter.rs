// Copyright 2026 Schoolyard Software, LLC.

//! LDAP-style search filter assembly and evaluation
//!
//! Filters travel as strings (`(&(objectClass=person)(uid=t*))`) so that
//! any LDAP-like backend can consume them. The parsed [`Filter`] form is
//! what [`crate::directory::MemoryDirectory`] evaluates.

use indexmap::IndexMap;

use crate::errors::DirectoryError;

/// Escape a value for use inside a search filter (RFC 4515)
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value but keep `*` as a wildcard.
///
/// Used by easy-filter searches where the caller-supplied term may
/// contain wildcards on purpose.
pub fn escape_keep_wildcards(value: &str) -> String {
    escape(value).replace("\\2a", "*")
}

/// Equality expression with escaping applied to the value
pub fn eq(attribute: &str, value: &str) -> String {
    format!("({}={})", attribute, escape(value))
}

/// Expression from a pre-escaped pattern (may contain wildcards)
pub fn pattern(attribute: &str, pat: &str) -> String {
    format!("({attribute}={pat})")
}

fn conjunction(op: char, parts: &[String]) -> String {
    let parts: Vec<&String> = parts.iter().filter(|p| !p.is_empty()).collect();
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => {
            let mut out = format!("({op}");
            for p in parts {
                out.push_str(p);
            }
            out.push(')');
            out
        }
    }
}

/// AND-conjunction of sub-filters; empty parts are dropped
pub fn and(parts: &[String]) -> String {
    conjunction('&', parts)
}

/// OR-conjunction of sub-filters; empty parts are dropped
pub fn or(parts: &[String]) -> String {
    conjunction('|', parts)
}

/// Wrap a bare `a=b` term in parentheses if they are missing
pub fn parenthesize(filter: &str) -> String {
    if filter.starts_with('(') {
        filter.to_string()
    } else {
        format!("({filter})")
    }
}

/// One segment of a match pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal text (unescaped)
    Literal(String),
    /// `*` wildcard
    Any,
}

/// A parsed search filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters must match
    And(Vec<Filter>),
    /// At least one sub-filter must match
    Or(Vec<Filter>),
    /// The sub-filter must not match
    Not(Box<Filter>),
    /// Attribute comparison against a wildcard pattern
    Cmp {
        /// Attribute name (matched case-insensitively)
        attribute: String,
        /// Pattern segments
        pattern: Vec<Segment>,
    },
}

impl Filter {
    /// Parse a filter string
    pub fn parse(input: &str) -> Result<Filter, DirectoryError> {
        let invalid = || DirectoryError::InvalidFilter {
            filter: input.to_string(),
        };
        let chars: Vec<char> = input.trim().chars().collect();
        let (filter, consumed) = parse_filter(&chars, 0).ok_or_else(invalid)?;
        if consumed != chars.len() {
            return Err(invalid());
        }
        Ok(filter)
    }

    /// Evaluate this filter against an entry's attribute map
    pub fn matches(&self, attributes: &IndexMap<String, Vec<String>>) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(attributes)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(attributes)),
            Filter::Not(inner) => !inner.matches(attributes),
            Filter::Cmp { attribute, pattern } => attributes
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(attribute))
                .flat_map(|(_, values)| values.iter())
                .any(|value| match_pattern(pattern, value)),
        }
    }
}

fn parse_filter(chars: &[char], mut pos: usize) -> Option<(Filter, usize)> {
    if chars.get(pos) != Some(&'(') {
        return None;
    }
    pos += 1;
    match chars.get(pos)? {
        '&' | '|' => {
            let op = chars[pos];
            pos += 1;
            let mut parts = Vec::new();
            while chars.get(pos) == Some(&'(') {
                let (inner, next) = parse_filter(chars, pos)?;
                parts.push(inner);
                pos = next;
            }
            if chars.get(pos) != Some(&')') || parts.is_empty() {
                return None;
            }
            let filter = if op == '&' {
                Filter::And(parts)
            } else {
                Filter::Or(parts)
            };
            Some((filter, pos + 1))
        }
        '!' => {
            let (inner, next) = parse_filter(chars, pos + 1)?;
            if chars.get(next) != Some(&')') {
                return None;
            }
            Some((Filter::Not(Box::new(inner)), next + 1))
        }
        _ => {
            let start = pos;
            while pos < chars.len() && chars[pos] != '=' {
                pos += 1;
            }
            if pos >= chars.len() || pos == start {
                return None;
            }
            let attribute: String = chars[start..pos].iter().collect();
            pos += 1;
            let mut pattern = Vec::new();
            let mut literal = String::new();
            while pos < chars.len() && chars[pos] != ')' {
                match chars[pos] {
                    '*' => {
                        if !literal.is_empty() {
                            pattern.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        if pattern.last() != Some(&Segment::Any) {
                            pattern.push(Segment::Any);
                        }
                        pos += 1;
                    }
                    '\\' => {
                        let hex: String = chars.get(pos + 1..pos + 3)?.iter().collect();
                        let byte = u8::from_str_radix(&hex, 16).ok()?;
                        literal.push(byte as char);
                        pos += 3;
                    }
                    c => {
                        literal.push(c);
                        pos += 1;
                    }
                }
            }
            if chars.get(pos) != Some(&')') {
                return None;
            }
            if !literal.is_empty() || pattern.is_empty() {
                pattern.push(Segment::Literal(literal));
            }
            Some((Filter::Cmp { attribute, pattern }, pos + 1))
        }
    }
}

fn match_pattern(pattern: &[Segment], value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    let mut remainder: &str = &value;
    let mut anchored = true;
    for (i, segment) in pattern.iter().enumerate() {
        match segment {
            Segment::Any => anchored = false,
            Segment::Literal(text) => {
                let text = text.to_ascii_lowercase();
                let last = i == pattern.len() - 1;
                if anchored {
                    if !remainder.starts_with(&text) {
                        return false;
                    }
                    remainder = &remainder[text.len()..];
                } else if last {
                    return remainder.ends_with(&text);
                } else {
                    match remainder.find(&text) {
                        Some(idx) => remainder = &remainder[idx + text.len()..],
                        None => return false,
                    }
                }
                if last {
                    return remainder.is_empty();
                }
            }
        }
    }
    // pattern ended with a wildcard (or was a single `*`)
    true
}
