// Copyright 2026 Schoolyard Software, LLC.

//! The object-lifecycle engine
//!
//! [`SchoolObject`] maps an in-memory school object onto its directory
//! representation. The DN is never stored: it is recomputed on every
//! access from the current name and container position, and divergence
//! between `dn()` and `old_dn()` *is* the pending-move signal consumed
//! by [`SchoolObject::move_object`].
//!
//! Write operations follow one protocol: pre-hooks, validation, the
//! core directory write, then post-hooks (only on success). "Not found"
//! conditions are `Ok(false)` returns, validation failures are
//! [`crate::errors::ModelError::Validation`], directory errors pass
//! through unmodified.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::attribute::{AttributeDescriptor, AttributeValue};
use crate::config::DirectoryConfig;
use crate::context::Context;
use crate::directory::{DirectoryEntry, SearchScope};
use crate::dn::{escape_dn_chars, parent_dn, rdn_value, school_ou_from_dn};
use crate::errors::{ModelError, ModelResult, ValidationError};
use crate::filter;
use crate::hooks::{HookStage, Operation};
use crate::members;
use crate::school;

/// Concrete (and abstract query) kinds of school objects.
///
/// `User` and `Group` are abstract: they never back a created object
/// but serve as query targets that match all of their sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// A school OU
    School,
    /// Any school user (abstract)
    User,
    /// Teacher user
    Teacher,
    /// Student user
    Student,
    /// Staff user
    Staff,
    /// User who is both teacher and staff
    TeacherAndStaff,
    /// School administrator user
    SchoolAdmin,
    /// Any school group (abstract)
    Group,
    /// Group outside the school container conventions
    BasicGroup,
    /// Class group
    SchoolClass,
    /// Work group
    WorkGroup,
    /// Computer-room group
    ComputerRoom,
    /// Generic container entry
    Container,
}

impl ModelKind {
    /// Stable name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::School => "School",
            ModelKind::User => "User",
            ModelKind::Teacher => "Teacher",
            ModelKind::Student => "Student",
            ModelKind::Staff => "Staff",
            ModelKind::TeacherAndStaff => "TeacherAndStaff",
            ModelKind::SchoolAdmin => "SchoolAdmin",
            ModelKind::Group => "Group",
            ModelKind::BasicGroup => "BasicGroup",
            ModelKind::SchoolClass => "SchoolClass",
            ModelKind::WorkGroup => "WorkGroup",
            ModelKind::ComputerRoom => "ComputerRoom",
            ModelKind::Container => "Container",
        }
    }

    /// Direct super-kinds of this kind
    pub fn parents(&self) -> &'static [ModelKind] {
        match self {
            ModelKind::Teacher
            | ModelKind::Student
            | ModelKind::Staff
            | ModelKind::SchoolAdmin => &[ModelKind::User],
            ModelKind::TeacherAndStaff => &[ModelKind::Teacher, ModelKind::Staff],
            ModelKind::BasicGroup
            | ModelKind::SchoolClass
            | ModelKind::WorkGroup
            | ModelKind::ComputerRoom => &[ModelKind::Group],
            _ => &[],
        }
    }

    /// Whether this kind is `other` or (transitively) one of its sub-kinds.
    ///
    /// Drives both hook targeting and the security check in
    /// [`SchoolObject::from_entry`]: a `SchoolClass` must never be
    /// treated as a `ComputerRoom`, while any `Teacher` may be handled
    /// as a `User`.
    pub fn is_subkind_of(&self, other: ModelKind) -> bool {
        if *self == other {
            return true;
        }
        self.parents().iter().any(|p| p.is_subkind_of(other))
    }

    /// Whether the kind only exists as a query target
    pub fn is_abstract(&self) -> bool {
        matches!(self, ModelKind::User | ModelKind::Group)
    }

    /// Static metadata of this kind
    pub fn meta(&self) -> &'static ObjectMeta {
        members::meta_for(*self)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Class-level metadata of a kind: module mapping, naming rules,
/// attribute descriptors and lifecycle flags
#[derive(Debug)]
pub struct ObjectMeta {
    /// The kind this metadata belongs to
    pub kind: ModelKind,
    /// Directory module tag (`users/user`, `groups/group`, ...)
    pub module: &'static str,
    /// Token used in external hook directory names
    pub hook_token: &'static str,
    /// DN key attribute (`uid`, `cn`, `ou`)
    pub name_key: &'static str,
    /// Whether names are unique domain-wide (not just per container)
    pub name_is_unique: bool,
    /// Whether objects of this kind may change schools via `modify`
    pub allow_school_change: bool,
    /// Whether the kind carries a `school` attribute
    pub supports_school: bool,
    /// Whether the kind carries a multi-valued `schools` attribute
    pub supports_schools: bool,
    /// Extra filter ANDed into every lookup of this kind
    pub module_filter: Option<&'static str>,
    /// Declarative attribute table
    pub attributes: &'static [AttributeDescriptor],
    /// Roles granted per school on creation
    pub default_roles: &'static [&'static str],
}

impl ObjectMeta {
    /// Descriptor lookup by attribute name
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDescriptor> {
        self.attributes.iter().find(|d| d.name == name)
    }

    /// Label shown in validation messages for a field
    pub fn label(&self, name: &str) -> &'static str {
        self.attribute(name).map(|d| d.label).unwrap_or("Unknown")
    }
}

/// A school object: typed attributes plus lifecycle bookkeeping
#[derive(Clone)]
pub struct SchoolObject {
    meta: &'static ObjectMeta,
    values: IndexMap<&'static str, AttributeValue>,
    position_override: Option<String>,
    old_dn: Option<String>,
    errors: IndexMap<String, Vec<String>>,
    warnings: IndexMap<String, Vec<String>>,
    backing: Option<DirectoryEntry>,
    backing_searched: bool,
    config: Arc<DirectoryConfig>,
}

impl fmt::Debug for SchoolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for SchoolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dn = self.dn();
        if dn.as_deref() != self.old_dn.as_deref() {
            write!(
                f,
                "{}(name={:?}, school={:?}, dn={:?}, old_dn={:?})",
                self.meta.kind,
                self.name(),
                self.school(),
                dn,
                self.old_dn
            )
        } else {
            write!(
                f,
                "{}(name={:?}, school={:?}, dn={:?})",
                self.meta.kind,
                self.name(),
                self.school(),
                dn
            )
        }
    }
}

impl SchoolObject {
    /// Construct a transient object.
    ///
    /// `old_dn` is snapshotted from the freshly computed DN, so
    /// mutating `name`, `school` or `position` afterwards signals a
    /// pending move.
    pub fn new(
        kind: ModelKind,
        name: Option<&str>,
        school: Option<&str>,
        config: Arc<DirectoryConfig>,
    ) -> Self {
        let meta = kind.meta();
        let mut values: IndexMap<&'static str, AttributeValue> = meta
            .attributes
            .iter()
            .map(|d| (d.name, AttributeValue::Null))
            .collect();
        if let Some(name) = name {
            if meta.attribute("name").is_some() {
                values.insert("name", AttributeValue::text(name));
            }
        }
        if let Some(school) = school {
            if meta.supports_school {
                values.insert("school", AttributeValue::text(school));
            }
        }
        let mut object = Self {
            meta,
            values,
            position_override: None,
            old_dn: None,
            errors: IndexMap::new(),
            warnings: IndexMap::new(),
            backing: None,
            backing_searched: false,
            config,
        };
        object.old_dn = object.dn();
        object
    }

    /// Construct with a full set of attributes, then snapshot `old_dn`
    pub fn with_attributes(
        kind: ModelKind,
        config: Arc<DirectoryConfig>,
        attributes: &[(&str, AttributeValue)],
    ) -> Self {
        let mut object = Self::new(kind, None, None, config);
        object.set_attributes(attributes);
        object.old_dn = object.dn();
        object
    }

    /// The concrete kind
    pub fn kind(&self) -> ModelKind {
        self.meta.kind
    }

    /// The kind's static metadata
    pub fn meta(&self) -> &'static ObjectMeta {
        self.meta
    }

    /// The session config this object was built with
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub(crate) fn config_arc(&self) -> Arc<DirectoryConfig> {
        Arc::clone(&self.config)
    }

    /// Current attribute value (Null for unknown attributes)
    pub fn get(&self, name: &str) -> AttributeValue {
        self.values.get(name).cloned().unwrap_or(AttributeValue::Null)
    }

    /// Set one attribute. Unknown attributes are ignored (logged) —
    /// callers feeding foreign mappings rely on that.
    pub fn set(&mut self, name: &str, value: AttributeValue) -> bool {
        match self.meta.attribute(name) {
            Some(desc) => {
                self.values.insert(desc.name, value);
                true
            }
            None => {
                debug!(kind = %self.meta.kind, attribute = name, "ignoring unknown attribute");
                false
            }
        }
    }

    /// Set several attributes at once, ignoring unknown ones
    pub fn set_attributes(&mut self, attributes: &[(&str, AttributeValue)]) {
        for (name, value) in attributes {
            self.set(name, value.clone());
        }
    }

    /// The object's name
    pub fn name(&self) -> Option<String> {
        self.get("name").as_text().map(str::to_string)
    }

    /// Set the object's name (changes `dn()`, not `old_dn()`)
    pub fn set_name(&mut self, name: &str) {
        self.set("name", AttributeValue::text(name));
    }

    /// The owning school, if the kind supports one
    pub fn school(&self) -> Option<String> {
        self.get("school").as_text().map(str::to_string)
    }

    /// Set the owning school
    pub fn set_school(&mut self, school: &str) {
        self.set("school", AttributeValue::text(school));
    }

    /// All schools the object belongs to (multi-school kinds)
    pub fn schools(&self) -> Vec<String> {
        self.get("schools").as_items()
    }

    /// Replace the school membership set
    pub fn set_schools(&mut self, schools: &[&str]) {
        self.set("schools", AttributeValue::items(schools.iter().copied()));
    }

    /// Last known directory position; `None` for transient objects
    pub fn old_dn(&self) -> Option<&str> {
        self.old_dn.as_deref()
    }

    /// Validation errors by attribute, from the last `validate()` call
    pub fn errors(&self) -> &IndexMap<String, Vec<String>> {
        &self.errors
    }

    /// Validation warnings by attribute, from the last `validate()` call
    pub fn warnings(&self) -> &IndexMap<String, Vec<String>> {
        &self.warnings
    }

    /// Record a validation error (deduplicated per attribute)
    pub fn add_error(&mut self, attribute: &str, message: impl Into<String>) {
        let message = message.into();
        let messages = self.errors.entry(attribute.to_string()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Record a validation warning (deduplicated per attribute)
    pub fn add_warning(&mut self, attribute: &str, message: impl Into<String>) {
        let message = message.into();
        let messages = self.warnings.entry(attribute.to_string()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    fn format_messages(&self, items: &IndexMap<String, Vec<String>>) -> String {
        let mut out = String::new();
        for (attribute, messages) in items {
            let label = self.meta.label(attribute);
            out.push_str(label);
            out.push_str(": ");
            for message in messages {
                out.push_str(message);
                if !(message.ends_with('!') || message.ends_with('.')) {
                    out.push('.');
                }
                out.push(' ');
            }
        }
        out.trim_end().to_string()
    }

    /// Human-readable joined error message (label + messages)
    pub fn error_message(&self) -> String {
        self.format_messages(&self.errors)
    }

    /// Human-readable joined warning message
    pub fn warning_message(&self) -> String {
        self.format_messages(&self.warnings)
    }

    /// Container position: explicit override, else the per-kind rule
    pub fn position(&self) -> Option<String> {
        match &self.position_override {
            Some(position) => Some(position.clone()),
            None => self.own_container(),
        }
    }

    /// Override the container position.
    ///
    /// A no-op when the position would not change, which keeps derived
    /// positions dynamic until the first real divergence.
    pub fn set_position(&mut self, position: &str) {
        if self.position().as_deref() != Some(position) {
            self.position_override = Some(position.to_string());
        }
    }

    /// Re-snapshot `old_dn` from the current position and drop the
    /// backing memo, discarding any pending-move signal. For transient
    /// objects that are given their real position after construction;
    /// without this, existence checks would still look at the DN
    /// derived from the constructor arguments.
    pub fn settle_position(&mut self) {
        self.old_dn = self.dn();
        self.invalidate_backing();
    }

    /// The per-kind container rule applied to the current school.
    /// A School's position derives from its own name (district mode).
    pub fn own_container(&self) -> Option<String> {
        let scope = if self.meta.kind == ModelKind::School {
            self.name()
        } else {
            self.school()
        };
        school::own_container(self.meta.kind, scope.as_deref(), &self.config)
    }

    /// The DN this object is assumed to live at.
    ///
    /// Pure function of `(name, position)`; falls back to `old_dn` when
    /// either is missing (objects pending deletion or not locatable).
    pub fn dn(&self) -> Option<String> {
        if let (Some(name), Some(position)) = (self.name(), self.position()) {
            return Some(format!(
                "{}={},{}",
                self.meta.name_key,
                escape_dn_chars(&name),
                position
            ));
        }
        self.old_dn.clone()
    }

    /// Resync `old_dn` (and the derived position) after a write.
    ///
    /// Does not "set" the DN — that is always computed — but records
    /// where the entry actually is and drops the cached backing entry.
    pub fn set_dn(&mut self, dn: &str) {
        self.backing = None;
        self.backing_searched = false;
        if let Some(parent) = parent_dn(dn) {
            self.set_position(&parent);
        }
        self.old_dn = Some(dn.to_string());
    }

    /// Forget the cached backing entry; the next access re-searches
    pub fn invalidate_backing(&mut self) {
        self.backing = None;
        self.backing_searched = false;
    }

    /// The school OU component of a DN
    pub fn school_from_dn(dn: &str) -> Option<String> {
        school_ou_from_dn(dn)
    }

    /// The name component of a DN
    pub fn name_from_dn(dn: &str) -> Option<String> {
        rdn_value(dn)
    }

    // ------------------------------------------------------------------
    // validation

    /// Run all validation rules, repopulating `errors` and `warnings`.
    ///
    /// Errors block writes; warnings do not. With `check_unlikely`, the
    /// persisted state is reloaded and fields flagged unlikely-to-change
    /// produce warnings when they differ.
    pub async fn validate(&mut self, ctx: &Context, check_unlikely: bool) -> ModelResult<()> {
        self.errors.clear();
        self.warnings.clear();

        for desc in self.meta.attributes {
            let value = self.get(desc.name);
            if let Err(message) = desc.validate(&value) {
                self.add_error(desc.name, message);
            }
        }

        if self.meta.name_is_unique
            && !self.meta.allow_school_change
            && self.exists_outside_school(ctx).await?
        {
            self.add_error(
                "name",
                "The name is already used somewhere outside the school. It may not be taken \
                 twice and has to be changed.",
            );
        }

        if self.meta.supports_school {
            if let Some(school) = self.school() {
                let mut school_obj = ctx.cached_school(&school).await;
                if !school_obj.exists(ctx).await? {
                    self.add_error(
                        "school",
                        format!(
                            "The school \"{school}\" does not exist. Please choose an existing \
                             one or create it."
                        ),
                    );
                }
            }
        }

        self.validate_roles();
        members::validate_kind_rules(self);

        if check_unlikely && self.exists(ctx).await? {
            if let Some(entry) = self.backing_entry(ctx).await? {
                match Self::from_entry(ctx, self.meta.kind, entry, self.school().as_deref()) {
                    Ok(persisted) => {
                        for desc in self.meta.attributes {
                            if !desc.unlikely_to_change {
                                continue;
                            }
                            let new_value = self.get(desc.name);
                            let old_value = persisted.get(desc.name);
                            if !new_value.is_empty()
                                && !old_value.is_empty()
                                && new_value != old_value
                            {
                                self.add_warning(
                                    desc.name,
                                    format!(
                                        "The value changed from {:?}. This seems unlikely.",
                                        old_value.as_items()
                                    ),
                                );
                            }
                        }
                    }
                    Err(err) if err.is_no_object() => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    /// Whether a persisted counterpart exists — the authoritative check
    pub async fn exists(&mut self, ctx: &Context) -> ModelResult<bool> {
        Ok(self.backing_entry(ctx).await?.is_some())
    }

    /// Whether an entry with this name exists outside the current school
    pub async fn exists_outside_school(&mut self, ctx: &Context) -> ModelResult<bool> {
        if !self.meta.supports_school {
            return Ok(false);
        }
        let Some(school) = self.school() else {
            return Ok(false);
        };
        let Some(entry) = self.backing_entry(ctx).await? else {
            return Ok(false);
        };
        let school_dn = school::school_dn(&school, &self.config);
        Ok(!crate::dn::dn_in_subtree(&entry.dn, &school_dn))
    }

    // ------------------------------------------------------------------
    // backing entry resolution

    /// The directory entry that corresponds to this object.
    ///
    /// For `name_is_unique` kinds any entry with this name matches; for
    /// everything else `old_dn` (or the computed DN) is looked up. The
    /// result is cached, even `None`; use [`Self::invalidate_backing`]
    /// to re-search.
    pub async fn backing_entry(&mut self, ctx: &Context) -> ModelResult<Option<DirectoryEntry>> {
        if self.backing_searched {
            return Ok(self.backing.clone());
        }
        let Some(dn) = self.old_dn.clone().or_else(|| self.dn()) else {
            error!(kind = %self.meta.kind, "cannot resolve backing entry without a DN");
            return Ok(None);
        };
        let found = if self.meta.name_is_unique {
            let Some(name) = Self::name_from_dn(&dn) else {
                error!(kind = %self.meta.kind, "cannot resolve backing entry without a name");
                return Ok(None);
            };
            let name_attr = self
                .meta
                .attribute("name")
                .and_then(|d| d.directory_name)
                .unwrap_or(self.meta.name_key);
            let name_filter = filter::eq(name_attr, &name);
            Self::get_first_entry(ctx, self.meta.kind, &name_filter).await?
        } else {
            debug!(kind = %self.meta.kind, dn, "resolving backing entry by DN");
            let entries = ctx
                .directory()
                .lookup(self.meta.module, &dn, SearchScope::Base, None)
                .await
                .or_else(ignore_missing_base)?;
            entries.into_iter().next()
        };
        self.backing = found;
        self.backing_searched = true;
        Ok(self.backing.clone())
    }

    /// The School object this object belongs to, if it exists
    pub async fn school_object(&self, ctx: &Context) -> ModelResult<Option<SchoolObject>> {
        if !self.meta.supports_school {
            return Ok(None);
        }
        let Some(school) = self.school() else {
            return Ok(None);
        };
        let dn = school::school_dn(&school, &self.config);
        match Self::from_dn(ctx, ModelKind::School, &dn, None).await {
            Ok(obj) => Ok(Some(obj)),
            Err(err) if err.is_no_object() => {
                warn!(school, "school does not exist");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------
    // create

    /// Create the directory entry for this object.
    ///
    /// Runs pre-hooks, then the core create, then post-hooks (only on
    /// success). Returns `Ok(false)` when an entry already exists.
    pub async fn create(&mut self, ctx: &Context, validate: bool) -> ModelResult<bool> {
        if ctx.in_hook() {
            warn!(
                object = %self,
                "running create() from within a hook, skipping hook execution; use \
                 create_without_hooks() from within hooks"
            );
            return self.create_without_hooks(ctx, validate).await;
        }
        ctx.dispatch_hooks(HookStage::Pre, Operation::Create, self).await?;
        let success = self.create_without_hooks(ctx, validate).await?;
        if success {
            ctx.dispatch_hooks(HookStage::Post, Operation::Create, self).await?;
        }
        Ok(success)
    }

    /// The core create, without any hook dispatch
    pub async fn create_without_hooks(&mut self, ctx: &Context, validate: bool) -> ModelResult<bool> {
        if self.exists(ctx).await? {
            return Ok(false);
        }
        info!(object = %self, "creating");

        self.seed_default_roles();

        if validate {
            self.validate(ctx, false).await?;
            if !self.errors.is_empty() {
                return Err(ValidationError::new(self.errors.clone()).into());
            }
        }

        if self.position().is_none() {
            error!(object = %self, "cannot determine a container, unable to create");
            return Ok(false);
        }

        let result = self.do_create(ctx).await;
        // the cache partition goes stale even on a failed write
        ctx.cache().invalidate_kind(self.meta.kind).await;
        result?;

        if let Some(dn) = self.dn() {
            self.set_dn(&dn);
        }
        info!(object = %self, "successfully created");
        Ok(true)
    }

    /// The actual entry write. School objects additionally build their
    /// dependent container/group hierarchy.
    async fn do_create(&mut self, ctx: &Context) -> ModelResult<()> {
        if self.meta.kind == ModelKind::School {
            if self.get("display_name").is_empty() {
                if let Some(name) = self.name() {
                    self.set("display_name", name.as_str().into());
                }
            }
            school::ensure_district(self, ctx).await?;
        }
        let Some(dn) = self.dn() else {
            return Err(ModelError::generic("cannot compute a DN for creation"));
        };
        let mut entry = DirectoryEntry::new(dn, self.meta.module);
        self.apply_to_entry(&mut entry);
        ctx.directory().add(entry).await?;
        if self.meta.kind == ModelKind::School {
            school::create_dependent_objects(self, ctx).await?;
        }
        Ok(())
    }

    /// Map attribute values onto a directory entry. Empty values are
    /// left untouched rather than cleared.
    pub(crate) fn apply_to_entry(&self, entry: &mut DirectoryEntry) {
        for desc in self.meta.attributes {
            let Some(directory_name) = desc.directory_name else {
                continue;
            };
            let value = self.get(desc.name);
            if !value.is_empty() {
                entry.set(directory_name, value.as_items());
            }
        }
    }

    // ------------------------------------------------------------------
    // modify

    /// Modify the persisted entry to match this object.
    ///
    /// Returns `Ok(false)` when no persisted entry exists. Reports
    /// success regardless of whether anything actually changed.
    pub async fn modify(
        &mut self,
        ctx: &Context,
        validate: bool,
        move_if_necessary: Option<bool>,
    ) -> ModelResult<bool> {
        if ctx.in_hook() {
            warn!(
                object = %self,
                "running modify() from within a hook, skipping hook execution; use \
                 modify_without_hooks() from within hooks"
            );
            return self.modify_without_hooks(ctx, validate, move_if_necessary).await;
        }
        ctx.dispatch_hooks(HookStage::Pre, Operation::Modify, self).await?;
        let success = self
            .modify_without_hooks(ctx, validate, move_if_necessary)
            .await?;
        if success {
            ctx.dispatch_hooks(HookStage::Post, Operation::Modify, self).await?;
        }
        Ok(success)
    }

    /// The core modify, without any hook dispatch
    pub async fn modify_without_hooks(
        &mut self,
        ctx: &Context,
        validate: bool,
        move_if_necessary: Option<bool>,
    ) -> ModelResult<bool> {
        info!(object = %self, "modifying");
        // renames relocate the entry by default
        let move_if_necessary = move_if_necessary.unwrap_or(true);

        self.update_role_strings();

        if validate {
            self.validate(ctx, true).await?;
            if !self.errors.is_empty() {
                return Err(ValidationError::new(self.errors.clone()).into());
            }
        }

        let Some(mut entry) = self.backing_entry(ctx).await? else {
            info!(old_dn = ?self.old_dn, "does not exist");
            return Ok(false);
        };

        let result = self.do_modify(ctx, &mut entry, move_if_necessary).await;
        ctx.cache().invalidate_kind(self.meta.kind).await;
        result?;
        Ok(true)
    }

    async fn do_modify(
        &mut self,
        ctx: &Context,
        entry: &mut DirectoryEntry,
        move_if_necessary: bool,
    ) -> ModelResult<()> {
        let old_attributes = entry.attributes.clone();
        self.apply_to_entry(entry);
        ctx.directory().modify(entry).await?;

        // `same` only drives logging; the operation reports success
        // either way (long-standing behavior callers rely on)
        let mut same = old_attributes == entry.attributes;
        let target_dn = self.dn();
        if move_if_necessary && target_dn.as_deref() != Some(entry.dn.as_str()) {
            if self.move_without_hooks(ctx, Some(entry.clone()), true).await? {
                same = false;
            }
        } else {
            self.set_dn(&entry.dn.clone());
        }
        if same {
            info!(object = %self, "not modified, nothing changed");
        } else {
            info!(object = %self, "successfully modified");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // move

    /// Relocate the persisted entry to the currently computed DN.
    ///
    /// Refuses (`Ok(false)`) when there is no backing entry, the target
    /// school does not exist, the target DN equals the current one, or
    /// school changes are not allowed and `force` is not set.
    pub async fn move_object(
        &mut self,
        ctx: &Context,
        backing: Option<DirectoryEntry>,
        force: bool,
    ) -> ModelResult<bool> {
        if ctx.in_hook() {
            warn!(
                object = %self,
                "running move() from within a hook, skipping hook execution; use \
                 move_without_hooks() from within hooks"
            );
            return self.move_without_hooks(ctx, backing, force).await;
        }
        ctx.dispatch_hooks(HookStage::Pre, Operation::Move, self).await?;
        let success = self.move_without_hooks(ctx, backing, force).await?;
        if success {
            ctx.dispatch_hooks(HookStage::Post, Operation::Move, self).await?;
        }
        Ok(success)
    }

    /// The core move, without any hook dispatch
    pub async fn move_without_hooks(
        &mut self,
        ctx: &Context,
        backing: Option<DirectoryEntry>,
        force: bool,
    ) -> ModelResult<bool> {
        let entry = match backing {
            Some(entry) => Some(entry),
            None => self.backing_entry(ctx).await?,
        };
        let Some(entry) = entry else {
            warn!(object = %self, "no directory entry found to move from");
            return Ok(false);
        };
        if self.meta.supports_school && self.school_object(ctx).await?.is_none() {
            warn!(object = %self, "wants to move itself to a non-existing school");
            return Ok(false);
        }
        let Some(target_dn) = self.dn() else {
            warn!(object = %self, "cannot compute a target DN");
            return Ok(false);
        };
        info!(from = %entry.dn, to = %target_dn, "moving");
        if entry.dn == target_dn {
            warn!(object = %self, "wants to move to its own DN");
            return Ok(false);
        }
        if !(force || self.meta.allow_school_change) {
            warn!(from = %entry.dn, object = %self, "move is not allowed");
            return Ok(false);
        }
        let result = self.do_move(ctx, &entry, &target_dn).await;
        ctx.cache().invalidate_kind(self.meta.kind).await;
        result?;
        self.set_dn(&target_dn);
        Ok(true)
    }

    async fn do_move(
        &mut self,
        ctx: &Context,
        entry: &DirectoryEntry,
        target_dn: &str,
    ) -> ModelResult<()> {
        let old_school = school_ou_from_dn(&entry.dn);
        let new_school = school_ou_from_dn(target_dn);
        ctx.directory().move_entry(&entry.dn, target_dn).await?;
        if self.meta.supports_school && old_school.is_some() && old_school != new_school {
            info!(
                old_dn = %entry.dn,
                from = ?old_school,
                to = ?new_school,
                "school change"
            );
            self.sync_roles_after_move(
                ctx,
                target_dn,
                old_school.as_deref().unwrap_or(""),
                new_school.as_deref().unwrap_or(""),
            )
            .await?;
        }
        Ok(())
    }

    /// Move the object into another school (forced move).
    ///
    /// Swaps the school membership set accordingly before moving.
    pub async fn change_school(&mut self, ctx: &Context, school: &str) -> ModelResult<bool> {
        let mut schools = self.schools();
        if let Some(current) = self.school() {
            schools.retain(|s| *s != current);
        }
        if !schools.iter().any(|s| s == school) {
            schools.push(school.to_string());
        }
        let schools: Vec<&str> = schools.iter().map(String::as_str).collect();
        self.set_schools(&schools);
        self.set_school(school);
        self.position_override = None;
        self.move_object(ctx, None, true).await
    }

    // ------------------------------------------------------------------
    // remove

    /// Delete the persisted entry (recursively).
    ///
    /// Returns `Ok(false)` when no persisted entry exists. On success
    /// the object is transient again: `old_dn` is cleared.
    pub async fn remove(&mut self, ctx: &Context) -> ModelResult<bool> {
        if ctx.in_hook() {
            warn!(
                object = %self,
                "running remove() from within a hook, skipping hook execution; use \
                 remove_without_hooks() from within hooks"
            );
            return self.remove_without_hooks(ctx).await;
        }
        ctx.dispatch_hooks(HookStage::Pre, Operation::Remove, self).await?;
        let success = self.remove_without_hooks(ctx).await?;
        if success {
            ctx.dispatch_hooks(HookStage::Post, Operation::Remove, self).await?;
        }
        Ok(success)
    }

    /// The core remove, without any hook dispatch
    pub async fn remove_without_hooks(&mut self, ctx: &Context) -> ModelResult<bool> {
        info!(object = %self, "deleting");
        let Some(entry) = self.backing_entry(ctx).await? else {
            info!(object = %self, "does not exist");
            return Ok(false);
        };
        let result = ctx.directory().delete(&entry.dn, true).await;
        ctx.cache().invalidate_kind(self.meta.kind).await;
        result?;
        if self.meta.kind == ModelKind::School {
            school::remove_dependent_objects(self, ctx).await?;
        }
        self.old_dn = None;
        self.invalidate_backing();
        info!(kind = %self.meta.kind, "successfully removed");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // collection queries

    /// All objects of `kind` in the school's container.
    ///
    /// With `easy_filter`, the filter term is matched against every
    /// searchable attribute (wildcards preserved); otherwise the filter
    /// string is used verbatim.
    pub async fn get_all(
        ctx: &Context,
        kind: ModelKind,
        school: &str,
        filter_str: Option<&str>,
        easy_filter: bool,
    ) -> ModelResult<Vec<SchoolObject>> {
        let meta = kind.meta();
        let Some(container) = school::own_container(kind, Some(school), ctx.config()) else {
            return Err(ModelError::generic(format!(
                "no container rule for {kind} in school {school}"
            )));
        };
        let mut parts: Vec<String> = Vec::new();
        if let Some(module_filter) = meta.module_filter {
            parts.push(filter::parenthesize(module_filter));
        }
        if easy_filter {
            if let Some(easy) = Self::build_easy_filter(kind, filter_str) {
                parts.push(easy);
            }
        } else if let Some(f) = filter_str {
            if !f.is_empty() {
                parts.push(filter::parenthesize(f));
            }
        }
        let combined = filter::and(&parts);
        let combined = (!combined.is_empty()).then_some(combined);
        debug!(kind = %kind, school, filter = ?combined, "getting all objects");
        let entries = ctx
            .directory()
            .lookup(
                meta.module,
                &container,
                SearchScope::Subtree,
                combined.as_deref(),
            )
            .await
            .or_else(ignore_missing_base)?;
        let mut objects = Vec::new();
        for entry in entries {
            match Self::from_entry(ctx, kind, entry, Some(school)) {
                Ok(object) => objects.push(object),
                Err(err) if err.is_no_object() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(objects)
    }

    /// OR-filter over all searchable attributes of the kind
    pub fn build_easy_filter(kind: ModelKind, filter_str: Option<&str>) -> Option<String> {
        let term = filter_str?;
        if term.is_empty() {
            return None;
        }
        let escaped = filter::escape_keep_wildcards(term);
        let parts: Vec<String> = kind
            .meta()
            .attributes
            .iter()
            .filter(|d| d.searchable)
            .filter_map(|d| d.directory_name)
            .map(|directory_name| filter::pattern(directory_name, &escaped))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(filter::or(&parts))
        }
    }

    /// Load the object at `dn`, verifying module and kind.
    ///
    /// Raises `WrongObjectType` when nothing matching the kind's module
    /// lives at the DN.
    pub async fn from_dn(
        ctx: &Context,
        kind: ModelKind,
        dn: &str,
        school: Option<&str>,
    ) -> ModelResult<SchoolObject> {
        let meta = kind.meta();
        let school = match school {
            Some(s) => Some(s.to_string()),
            None if meta.supports_school => {
                let guessed = school_ou_from_dn(dn);
                if guessed.is_none() {
                    warn!(dn, "unable to guess school from DN");
                }
                guessed
            }
            None => None,
        };
        debug!(kind = %kind, dn, "looking up object");
        let module_filter = meta.module_filter.map(filter::parenthesize);
        let entries = ctx
            .directory()
            .lookup(meta.module, dn, SearchScope::Base, module_filter.as_deref())
            .await
            .or_else(ignore_missing_base)?;
        let Some(entry) = entries.into_iter().next() else {
            return Err(ModelError::WrongObjectType {
                dn: dn.to_string(),
                expected: kind.name(),
            });
        };
        Self::from_entry(ctx, kind, entry, school.as_deref())
    }

    /// Build a typed object from a directory entry.
    ///
    /// The concrete kind is resolved from the entry itself (module tag
    /// plus attribute signature); an entry resolving outside the
    /// requested kind's sub-kind set is rejected with `WrongModel`.
    pub fn from_entry(
        ctx: &Context,
        kind: ModelKind,
        entry: DirectoryEntry,
        school: Option<&str>,
    ) -> ModelResult<SchoolObject> {
        let resolved = members::kind_for_entry(&entry, ctx.config()).ok_or_else(|| {
            warn!(dn = %entry.dn, "entry does not correspond to a registered kind");
            ModelError::UnknownModel {
                dn: entry.dn.clone(),
            }
        })?;
        if resolved != kind {
            debug!(dn = %entry.dn, requested = %kind, actual = %resolved, "kind dispatch");
            if !resolved.is_subkind_of(kind) {
                return Err(ModelError::WrongModel {
                    dn: entry.dn.clone(),
                    expected: kind.name(),
                    actual: resolved.name(),
                });
            }
        }
        let meta = resolved.meta();
        let school = school_ou_from_dn(&entry.dn).or_else(|| school.map(str::to_string));
        let mut object = SchoolObject::new(
            resolved,
            entry.name().as_deref(),
            school.as_deref(),
            ctx.config_arc(),
        );
        for desc in meta.attributes {
            let Some(directory_name) = desc.directory_name else {
                continue;
            };
            let values = entry.values(directory_name);
            if values.is_empty() {
                continue;
            }
            object.set(
                desc.name,
                AttributeValue::from_directory(&values, desc.multi_valued),
            );
        }
        object.set_dn(&entry.dn);
        object.backing = Some(entry);
        object.backing_searched = true;
        Ok(object)
    }

    /// The one entry matching `filter_str`, or `None`.
    ///
    /// More than one match raises `MultipleObjects` carrying all DNs.
    pub async fn get_only_entry(
        ctx: &Context,
        kind: ModelKind,
        filter_str: &str,
        base: Option<&str>,
    ) -> ModelResult<Option<DirectoryEntry>> {
        let meta = kind.meta();
        let mut parts: Vec<String> = Vec::new();
        if let Some(module_filter) = meta.module_filter {
            parts.push(filter::parenthesize(module_filter));
        }
        parts.push(filter::parenthesize(filter_str));
        let combined = filter::and(&parts);
        let base = base.unwrap_or(&ctx.config().base_dn);
        debug!(kind = %kind, filter = %combined, "getting single entry");
        let mut entries = ctx
            .directory()
            .lookup(meta.module, base, SearchScope::Subtree, Some(&combined))
            .await
            .or_else(ignore_missing_base)?;
        match entries.len() {
            0 => Ok(None),
            1 => Ok(Some(entries.remove(0))),
            _ => Err(ModelError::MultipleObjects {
                filter: combined,
                matches: entries.into_iter().map(|e| e.dn).collect(),
            }),
        }
    }

    /// The first entry matching `filter_str`; tolerates multiple matches
    pub async fn get_first_entry(
        ctx: &Context,
        kind: ModelKind,
        filter_str: &str,
    ) -> ModelResult<Option<DirectoryEntry>> {
        let meta = kind.meta();
        let mut parts: Vec<String> = Vec::new();
        if let Some(module_filter) = meta.module_filter {
            parts.push(filter::parenthesize(module_filter));
        }
        parts.push(filter::parenthesize(filter_str));
        let combined = filter::and(&parts);
        let entries = ctx
            .directory()
            .lookup(
                meta.module,
                &ctx.config().base_dn,
                SearchScope::Subtree,
                Some(&combined),
            )
            .await
            .or_else(ignore_missing_base)?;
        Ok(entries.into_iter().next())
    }

    // ------------------------------------------------------------------
    // export

    /// JSON representation: DN, kind, and all non-internal attributes
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("dn".to_string(), json!(self.dn()));
        map.insert("kind".to_string(), json!(self.meta.kind.name()));
        map.insert("object_type".to_string(), json!(self.meta.module));
        for desc in self.meta.attributes {
            if desc.internal {
                continue;
            }
            map.insert(desc.name.to_string(), json!(self.get(desc.name)));
        }
        serde_json::Value::Object(map)
    }

    /// Render the tab-separated external hook line for an operation.
    ///
    /// `None` means no line and therefore no external hook invocation.
    pub fn build_hook_line(&self, stage: HookStage, operation: Operation) -> Option<String> {
        members::build_hook_line(self, stage, operation)
    }
}

/// A lookup under a missing base behaves like an empty result — the
/// caller sees "nothing found", matching real directory semantics for
/// collection queries.
fn ignore_missing_base(
    err: crate::errors::DirectoryError,
) -> Result<Vec<DirectoryEntry>, crate::errors::DirectoryError> {
    match err {
        crate::errors::DirectoryError::NoSuchEntry { dn } => {
            warn!(dn, "lookup base does not exist");
            Ok(Vec::new())
        }
        other => Err(other),
    }
}
