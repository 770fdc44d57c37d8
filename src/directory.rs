// Copyright 2026 Schoolyard Software, LLC.

//! The directory collaborator seam
//!
//! The lifecycle engine talks to an LDAP-like store exclusively through
//! the [`Directory`] trait: lookup by filter within a subtree, create,
//! modify, move and recursive delete of attributed entries. A real
//! deployment binds this to an LDAP client; [`MemoryDirectory`] is the
//! in-process tree used by tests and fixtures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::dn::{dn_in_subtree, normalize_dn, parent_dn, rdn_value};
use crate::errors::DirectoryError;
use crate::filter::Filter;

/// A persisted entry: DN plus attribute mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry
    pub dn: String,
    /// Module tag describing the entry shape (`users/user`, `groups/group`, ...)
    pub module: String,
    /// Attribute name -> values
    pub attributes: IndexMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// New empty entry
    pub fn new(dn: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            module: module.into(),
            attributes: IndexMap::new(),
        }
    }

    /// First value of an attribute
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of an attribute
    pub fn values(&self, attribute: &str) -> Vec<String> {
        self.attributes.get(attribute).cloned().unwrap_or_default()
    }

    /// Replace an attribute's values; empty removes the attribute
    pub fn set(&mut self, attribute: &str, values: Vec<String>) {
        if values.is_empty() {
            self.attributes.shift_remove(attribute);
        } else {
            self.attributes.insert(attribute.to_string(), values);
        }
    }

    /// Set a single-valued attribute
    pub fn set_one(&mut self, attribute: &str, value: impl Into<String>) {
        self.set(attribute, vec![value.into()]);
    }

    /// Parent position of this entry
    pub fn position(&self) -> Option<String> {
        parent_dn(&self.dn)
    }

    /// Name component of this entry's RDN
    pub fn name(&self) -> Option<String> {
        rdn_value(&self.dn)
    }
}

/// Search depth for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base DN itself
    Base,
    /// The base DN and everything below it
    Subtree,
}

/// The LDAP-like store the engine operates against.
///
/// Implementations are a single shared handle per logical session; the
/// engine does not pool or retry. Errors pass through to callers
/// unmodified.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Find entries of `module` under `base`, optionally narrowed by a filter
    async fn lookup(
        &self,
        module: &str,
        base: &str,
        scope: SearchScope,
        filter: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Create a new entry; its parent container must exist
    async fn add(&self, entry: DirectoryEntry) -> Result<(), DirectoryError>;

    /// Replace the attributes of an existing entry
    async fn modify(&self, entry: &DirectoryEntry) -> Result<(), DirectoryError>;

    /// Replace one attribute of an entry in place (raw delta).
    ///
    /// Used by role synchronization, which must bypass the full modify
    /// path to avoid re-entering the lifecycle engine.
    async fn replace_attribute(
        &self,
        dn: &str,
        attribute: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), DirectoryError>;

    /// Relocate an entry (and its subtree) to a new DN
    async fn move_entry(&self, old_dn: &str, new_dn: &str) -> Result<(), DirectoryError>;

    /// Delete an entry; with `recursive` the whole subtree goes
    async fn delete(&self, dn: &str, recursive: bool) -> Result<(), DirectoryError>;
}

/// In-memory, tree-aware [`Directory`] implementation.
///
/// Entries are kept under case-folded DNs; parent containers are
/// enforced on `add` just like a real directory server would.
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<String, DirectoryEntry>>,
}

impl MemoryDirectory {
    /// New directory seeded with a base entry at `base_dn`
    pub fn new(base_dn: &str) -> Self {
        let mut entries = BTreeMap::new();
        let base = DirectoryEntry::new(base_dn, "container/dc");
        entries.insert(normalize_dn(base_dn), base);
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// All DNs currently stored, in tree order
    pub async fn dns(&self) -> Vec<String> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| e.dn.clone())
            .collect()
    }

    /// Fetch a single entry by DN
    pub async fn entry(&self, dn: &str) -> Option<DirectoryEntry> {
        self.entries.read().await.get(&normalize_dn(dn)).cloned()
    }

    /// Whether any entry exists at the DN
    pub async fn contains(&self, dn: &str) -> bool {
        self.entries.read().await.contains_key(&normalize_dn(dn))
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn lookup(
        &self,
        module: &str,
        base: &str,
        scope: SearchScope,
        filter: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let parsed = match filter {
            Some(f) if !f.is_empty() => Some(Filter::parse(f)?),
            _ => None,
        };
        let entries = self.entries.read().await;
        let mut found = Vec::new();
        for entry in entries.values() {
            let in_scope = match scope {
                SearchScope::Base => normalize_dn(&entry.dn) == normalize_dn(base),
                SearchScope::Subtree => dn_in_subtree(&entry.dn, base),
            };
            if !in_scope || entry.module != module {
                continue;
            }
            if let Some(f) = &parsed {
                if !f.matches(&entry.attributes) {
                    continue;
                }
            }
            found.push(entry.clone());
        }
        debug!(
            module,
            base,
            count = found.len(),
            "memory directory lookup"
        );
        Ok(found)
    }

    async fn add(&self, entry: DirectoryEntry) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let key = normalize_dn(&entry.dn);
        if entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists { dn: entry.dn });
        }
        let parent = parent_dn(&entry.dn).ok_or_else(|| DirectoryError::InvalidDn {
            dn: entry.dn.clone(),
        })?;
        if !entries.contains_key(&normalize_dn(&parent)) {
            return Err(DirectoryError::MissingParent { dn: entry.dn });
        }
        entries.insert(key, entry);
        Ok(())
    }

    async fn modify(&self, entry: &DirectoryEntry) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let key = normalize_dn(&entry.dn);
        match entries.get_mut(&key) {
            Some(stored) => {
                stored.attributes = entry.attributes.clone();
                Ok(())
            }
            None => Err(DirectoryError::NoSuchEntry {
                dn: entry.dn.clone(),
            }),
        }
    }

    async fn replace_attribute(
        &self,
        dn: &str,
        attribute: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let stored = entries
            .get_mut(&normalize_dn(dn))
            .ok_or_else(|| DirectoryError::NoSuchEntry { dn: dn.to_string() })?;
        let current = stored.values(attribute);
        if current != old {
            debug!(dn, attribute, "stale old values in attribute replace");
        }
        stored.set(attribute, new.to_vec());
        Ok(())
    }

    async fn move_entry(&self, old_dn: &str, new_dn: &str) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let old_key = normalize_dn(old_dn);
        if !entries.contains_key(&old_key) {
            return Err(DirectoryError::NoSuchEntry {
                dn: old_dn.to_string(),
            });
        }
        if entries.contains_key(&normalize_dn(new_dn)) {
            return Err(DirectoryError::AlreadyExists {
                dn: new_dn.to_string(),
            });
        }
        let subtree: Vec<String> = entries
            .keys()
            .filter(|key| dn_in_subtree(key, old_dn))
            .cloned()
            .collect();
        for key in subtree {
            let mut entry = entries.remove(&key).expect("key collected above");
            let suffix_len = entry.dn.len() - old_dn.len();
            entry.dn = format!("{}{}", &entry.dn[..suffix_len], new_dn);
            entries.insert(normalize_dn(&entry.dn), entry);
        }
        Ok(())
    }

    async fn delete(&self, dn: &str, recursive: bool) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let key = normalize_dn(dn);
        if !entries.contains_key(&key) {
            return Err(DirectoryError::NoSuchEntry { dn: dn.to_string() });
        }
        let children: Vec<String> = entries
            .keys()
            .filter(|k| **k != key && dn_in_subtree(k, dn))
            .cloned()
            .collect();
        if !children.is_empty() && !recursive {
            return Err(DirectoryError::NotLeaf { dn: dn.to_string() });
        }
        for child in children {
            entries.remove(&child);
        }
        entries.remove(&key);
        Ok(())
    }
}
