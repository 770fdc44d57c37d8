// Copyright 2026 Schoolyard Software, LLC.

//! Role strings
//!
//! Every school object carries `role:context_type:context` strings
//! (e.g. `teacher:school:Alpha`) mirroring its school memberships. The
//! engine keeps them in sync: seeded on create, reconciled on modify,
//! and rewritten in place after a cross-school move.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::attribute::{AttributeValue, ROLE_STRING_RE};
use crate::context::Context;
use crate::errors::ModelResult;
use crate::model::SchoolObject;

/// Context type of school-scoped role strings
pub const CONTEXT_SCHOOL: &str = "school";

/// Teacher role
pub const ROLE_TEACHER: &str = "teacher";
/// Student role
pub const ROLE_STUDENT: &str = "student";
/// Staff role
pub const ROLE_STAFF: &str = "staff";
/// School-admin role
pub const ROLE_SCHOOL_ADMIN: &str = "school_admin";
/// Role of the per-school admin group
pub const ROLE_SCHOOL_ADMIN_GROUP: &str = "school_admin_group";
/// Role of class groups
pub const ROLE_SCHOOL_CLASS: &str = "school_class";
/// Role of work groups
pub const ROLE_WORKGROUP: &str = "workgroup";
/// Role of computer-room groups
pub const ROLE_COMPUTER_ROOM: &str = "computer_room";
/// Role of the school OU itself
pub const ROLE_SCHOOL: &str = "school";

/// A parsed `role:context_type:context` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleString {
    /// The role part
    pub role: String,
    /// The context type part (almost always `school`)
    pub context_type: String,
    /// The context part (the school name, for school contexts)
    pub context: String,
}

impl RoleString {
    /// Role string in the `school` context
    pub fn school_context(role: &str, school: &str) -> Self {
        Self {
            role: role.to_string(),
            context_type: CONTEXT_SCHOOL.to_string(),
            context: school.to_string(),
        }
    }

    /// Whether this is a `school`-context role for the given school
    /// (school names compare case-insensitively)
    pub fn is_school_context(&self, school: &str) -> bool {
        self.context_type == CONTEXT_SCHOOL && self.context.eq_ignore_ascii_case(school)
    }
}

impl fmt::Display for RoleString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.role, self.context_type, self.context)
    }
}

impl FromStr for RoleString {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !ROLE_STRING_RE.is_match(s) {
            return Err(format!("invalid role string: {s:?}"));
        }
        let mut parts = s.splitn(3, ':');
        Ok(Self {
            role: parts.next().unwrap_or_default().to_string(),
            context_type: parts.next().unwrap_or_default().to_string(),
            context: parts.next().unwrap_or_default().to_string(),
        })
    }
}

impl SchoolObject {
    /// All schools the object currently belongs to: the primary school
    /// plus the membership set, deduplicated, primary first
    pub fn current_schools(&self) -> Vec<String> {
        let mut schools = Vec::new();
        if let Some(school) = self.school() {
            schools.push(school);
        }
        for school in self.schools() {
            if !schools.iter().any(|s| s.eq_ignore_ascii_case(&school)) {
                schools.push(school);
            }
        }
        schools
    }

    /// The object's role strings, parsed (unparseable ones skipped)
    pub fn role_strings(&self) -> Vec<RoleString> {
        self.get("roles")
            .as_items()
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    fn set_role_strings(&mut self, roles: &[RoleString]) {
        self.set(
            "roles",
            AttributeValue::items(roles.iter().map(|r| r.to_string())),
        );
    }

    /// Grant the kind's default roles for every current school.
    ///
    /// Only fills in roles on otherwise role-less objects; imported
    /// objects keep whatever they carry.
    pub fn seed_default_roles(&mut self) {
        if self.meta().attribute("roles").is_none() || !self.get("roles").is_empty() {
            return;
        }
        let defaults = self.meta().default_roles;
        if defaults.is_empty() {
            return;
        }
        let mut roles = Vec::new();
        for school in self.current_schools() {
            for role in defaults {
                roles.push(RoleString::school_context(role, &school));
            }
        }
        if !roles.is_empty() {
            debug!(object = %self, count = roles.len(), "seeding default roles");
            self.set_role_strings(&roles);
        }
    }

    /// Reconcile role strings with the current school membership set.
    ///
    /// Drops school-context roles for schools the object left, adds the
    /// default roles for schools it joined. Non-school contexts are
    /// never touched. Mutates only in memory; a subsequent modify
    /// persists the result.
    pub fn update_role_strings(&mut self) {
        if self.meta().attribute("roles").is_none() {
            return;
        }
        let schools = self.current_schools();
        let mut roles = self.role_strings();
        let before = roles.clone();

        roles.retain(|role| {
            role.context_type != CONTEXT_SCHOOL
                || schools.iter().any(|s| role.is_school_context(s))
        });
        for school in &schools {
            if roles.iter().any(|r| r.is_school_context(school)) {
                continue;
            }
            for role in self.meta().default_roles {
                roles.push(RoleString::school_context(role, school));
            }
        }
        if roles != before {
            debug!(object = %self, "reconciling role strings with school membership");
            self.set_role_strings(&roles);
        }
    }

    /// Rewrite school-context role strings after a cross-school move.
    ///
    /// Pushed as a raw attribute delta at the target DN: the entry just
    /// moved, and re-entering the modify path from inside the move
    /// would recurse.
    pub async fn sync_roles_after_move(
        &mut self,
        ctx: &Context,
        dn: &str,
        old_school: &str,
        new_school: &str,
    ) -> ModelResult<()> {
        let Some(desc) = self.meta().attribute("roles") else {
            return Ok(());
        };
        let Some(directory_name) = desc.directory_name else {
            return Ok(());
        };
        let old_values = self.get("roles").as_items();
        let mut new_roles: Vec<RoleString> = Vec::new();
        for role in self.role_strings() {
            let rewritten = if role.is_school_context(old_school) {
                RoleString::school_context(&role.role, new_school)
            } else {
                role
            };
            if !new_roles.contains(&rewritten) {
                new_roles.push(rewritten);
            }
        }
        let new_values: Vec<String> = new_roles.iter().map(|r| r.to_string()).collect();
        if new_values == old_values {
            return Ok(());
        }
        info!(dn, old_school, new_school, "rewriting role strings after move");
        ctx.directory()
            .replace_attribute(dn, directory_name, &old_values, &new_values)
            .await?;
        self.set_role_strings(&new_roles);
        Ok(())
    }

    /// Syntax-check every role string, recording errors on `roles`
    pub fn validate_roles(&mut self) {
        if self.meta().attribute("roles").is_none() {
            return;
        }
        for value in self.get("roles").as_items() {
            if !ROLE_STRING_RE.is_match(&value) {
                self.add_error(
                    "roles",
                    format!("Role has bad format: {value:?} (expected role:context_type:context)."),
                );
            }
        }
    }
}
