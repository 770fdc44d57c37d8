// Copyright 2026 Schoolyard Software, LLC.

//! Distinguished-name assembly and escaping
//!
//! A DN is never stored independently: it is always derived from an
//! object's name and container position. The helpers here keep that
//! derivation safe against directory special characters.

/// Characters that must be escaped inside a DN attribute value
const DN_SPECIALS: &[char] = &['\\', ',', '+', '"', '<', '>', ';', '='];

/// Escape an attribute value for use inside a DN.
///
/// Follows RFC 4514: backslash-escapes special characters, a leading
/// `#` or space, and a trailing space.
pub fn escape_dn_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let chars: Vec<char> = value.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        let leading = i == 0 && (*c == '#' || *c == ' ');
        let trailing = i == chars.len() - 1 && *c == ' ';
        if DN_SPECIALS.contains(c) || leading || trailing {
            out.push('\\');
        }
        out.push(*c);
    }
    out
}

/// Remove DN escaping from an attribute value
pub fn unescape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Split a DN into its RDN components, honoring escaped commas
pub fn explode_dn(dn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in dn.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            ',' => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// The attribute/value pair of a single RDN, unescaped
pub fn split_rdn(rdn: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (i, c) in rdn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => {
                let attr = rdn[..i].trim().to_string();
                let value = unescape_dn_value(rdn[i + 1..].trim());
                return Some((attr, value));
            }
            _ => {}
        }
    }
    None
}

/// The value of the first RDN of a DN (`uid=t1,...` -> `t1`)
pub fn rdn_value(dn: &str) -> Option<String> {
    explode_dn(dn)
        .first()
        .and_then(|rdn| split_rdn(rdn))
        .map(|(_, value)| value)
}

/// The parent position of a DN (everything after the first RDN)
pub fn parent_dn(dn: &str) -> Option<String> {
    let parts = explode_dn(dn);
    if parts.len() < 2 {
        return None;
    }
    Some(parts[1..].join(","))
}

/// The value of the first `ou=` component of a DN, if any.
///
/// Used to infer the school an entry belongs to from its position.
pub fn school_ou_from_dn(dn: &str) -> Option<String> {
    for rdn in explode_dn(dn) {
        if let Some((attr, value)) = split_rdn(&rdn) {
            if attr.eq_ignore_ascii_case("ou") {
                return Some(value);
            }
        }
    }
    None
}

/// Case-folded form of a DN, used as a lookup key.
///
/// Directory DNs compare case-insensitively; values with meaningful case
/// survive in the stored entry itself.
pub fn normalize_dn(dn: &str) -> String {
    dn.to_ascii_lowercase()
}

/// Whether `dn` sits inside the subtree rooted at `base` (inclusive)
pub fn dn_in_subtree(dn: &str, base: &str) -> bool {
    let dn = normalize_dn(dn);
    let base = normalize_dn(base);
    dn == base || dn.ends_with(&format!(",{base}"))
}
