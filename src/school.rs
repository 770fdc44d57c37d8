// Copyright 2026 Schoolyard Software, LLC.

//! School OU layout
//!
//! A school is an OU with a fixed tree of well-known sub-containers
//! underneath it. [`SchoolSearchBase`] computes the DN of every
//! container; [`own_container`] picks the right one per object kind.
//! Creating a school also creates its container tree and the
//! domain-wide network/admin groups that belong to it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::attribute::AttributeValue;
use crate::config::DirectoryConfig;
use crate::context::Context;
use crate::directory::{DirectoryEntry, SearchScope};
use crate::errors::{DirectoryError, ModelError, ModelResult};
use crate::model::{ModelKind, SchoolObject};
use crate::roles::{RoleString, ROLE_SCHOOL_ADMIN_GROUP};

/// District OU name for a school: the first two characters of its name.
/// Only meaningful with district mode enabled.
pub fn district_for(school_name: &str) -> String {
    school_name.chars().take(2).collect()
}

/// DN of a school OU, honoring district mode
pub fn school_dn(school_name: &str, config: &DirectoryConfig) -> String {
    if config.district_mode {
        format!(
            "ou={},ou={},{}",
            crate::dn::escape_dn_chars(school_name),
            crate::dn::escape_dn_chars(&district_for(school_name)),
            config.base_dn
        )
    } else {
        format!(
            "ou={},{}",
            crate::dn::escape_dn_chars(school_name),
            config.base_dn
        )
    }
}

/// Computes the DNs of the well-known containers of one school
#[derive(Debug, Clone)]
pub struct SchoolSearchBase {
    school_dn: String,
    config: Arc<DirectoryConfig>,
}

impl SchoolSearchBase {
    /// Search base for a school name
    pub fn new(school_name: &str, config: Arc<DirectoryConfig>) -> Self {
        Self {
            school_dn: school_dn(school_name, &config),
            config,
        }
    }

    /// DN of the school OU itself
    pub fn school_dn(&self) -> &str {
        &self.school_dn
    }

    fn sub(&self, rdn: &str) -> String {
        format!("{rdn},{}", self.school_dn)
    }

    /// `cn=users` container
    pub fn users(&self) -> String {
        self.sub("cn=users")
    }

    /// `cn=groups` container
    pub fn groups(&self) -> String {
        self.sub("cn=groups")
    }

    /// `cn=shares` container
    pub fn shares(&self) -> String {
        self.sub("cn=shares")
    }

    /// `cn=computers` container
    pub fn computers(&self) -> String {
        self.sub("cn=computers")
    }

    /// `cn=networks` container
    pub fn networks(&self) -> String {
        self.sub("cn=networks")
    }

    /// `cn=printers` container
    pub fn printers(&self) -> String {
        self.sub("cn=printers")
    }

    /// `cn=policies` container
    pub fn policies(&self) -> String {
        self.sub("cn=policies")
    }

    /// `cn=dhcp` container
    pub fn dhcp(&self) -> String {
        self.sub("cn=dhcp")
    }

    /// Container for student users
    pub fn students(&self) -> String {
        format!("cn={},{}", self.config.containers.students, self.users())
    }

    /// Container for teacher users
    pub fn teachers(&self) -> String {
        format!("cn={},{}", self.config.containers.teachers, self.users())
    }

    /// Container for staff users
    pub fn staff(&self) -> String {
        format!("cn={},{}", self.config.containers.staff, self.users())
    }

    /// Container for teacher-and-staff users
    pub fn teachers_and_staff(&self) -> String {
        format!(
            "cn={},{}",
            self.config.containers.teachers_and_staff,
            self.users()
        )
    }

    /// Container for school-admin users
    pub fn admins(&self) -> String {
        format!("cn={},{}", self.config.containers.admins, self.users())
    }

    /// Container for work groups
    pub fn workgroups(&self) -> String {
        format!("cn={},{}", self.config.containers.students, self.groups())
    }

    /// Container for class groups (below the work-group container)
    pub fn classes(&self) -> String {
        format!("cn={},{}", self.config.containers.classes, self.workgroups())
    }

    /// Container for computer-room groups
    pub fn rooms(&self) -> String {
        format!("cn={},{}", self.config.containers.rooms, self.groups())
    }

    /// Container for class shares
    pub fn class_shares(&self) -> String {
        format!("cn={},{}", self.config.containers.classes, self.shares())
    }
}

/// The container an object of `kind` lives in, for the given scope.
///
/// The scope is the school name for school-bound kinds and the school's
/// own name for the School kind itself. `None` when the kind needs a
/// school and no scope is given.
pub fn own_container(
    kind: ModelKind,
    scope: Option<&str>,
    config: &DirectoryConfig,
) -> Option<String> {
    if kind == ModelKind::School {
        return Some(if config.district_mode {
            let name = scope?;
            format!(
                "ou={},{}",
                crate::dn::escape_dn_chars(&district_for(name)),
                config.base_dn
            )
        } else {
            config.base_dn.clone()
        });
    }
    if kind == ModelKind::BasicGroup {
        return Some(format!("cn=groups,{}", config.base_dn));
    }
    let school = scope?;
    let base = SchoolSearchBase::new(school, Arc::new(config.clone()));
    Some(match kind {
        ModelKind::User => base.users(),
        ModelKind::Teacher => base.teachers(),
        ModelKind::Student => base.students(),
        ModelKind::Staff => base.staff(),
        ModelKind::TeacherAndStaff => base.teachers_and_staff(),
        ModelKind::SchoolAdmin => base.admins(),
        ModelKind::Group => base.groups(),
        ModelKind::SchoolClass => base.classes(),
        ModelKind::WorkGroup => base.workgroups(),
        ModelKind::ComputerRoom => base.rooms(),
        ModelKind::Container => base.school_dn().to_string(),
        ModelKind::School | ModelKind::BasicGroup => unreachable!("handled above"),
    })
}

/// School-specific validation: the educational and the administrative
/// server must differ
pub fn validate_school(object: &mut SchoolObject) {
    let dc = object.get("dc_name").as_text().map(str::to_string);
    let dc_admin = object
        .get("dc_name_administrative")
        .as_text()
        .map(str::to_string);
    if let (Some(dc), Some(dc_admin)) = (dc, dc_admin) {
        if dc.eq_ignore_ascii_case(&dc_admin) {
            let message =
                "The educational server and the administrative server must not be the same.";
            object.add_error("dc_name", message);
            object.add_error("dc_name_administrative", message);
        }
    }
}

/// With district mode, make sure the district OU of a school exists
pub async fn ensure_district(object: &mut SchoolObject, ctx: &Context) -> ModelResult<()> {
    if !ctx.config().district_mode {
        return Ok(());
    }
    let Some(name) = object.name() else {
        return Err(ModelError::generic("cannot create a district for a nameless school"));
    };
    let district = district_for(&name);
    let dn = format!(
        "ou={},{}",
        crate::dn::escape_dn_chars(&district),
        ctx.config().base_dn
    );
    let existing = ctx
        .directory()
        .lookup("container/ou", &dn, SearchScope::Base, None)
        .await
        .unwrap_or_default();
    if !existing.is_empty() {
        return Ok(());
    }
    info!(district, "creating district OU");
    let mut entry = DirectoryEntry::new(dn, "container/ou");
    entry.set_one("ou", district);
    ctx.directory().add(entry).await?;
    Ok(())
}

async fn create_container(
    ctx: &Context,
    school_name: &str,
    name: &str,
    position: &str,
) -> ModelResult<()> {
    let mut container = SchoolObject::new(
        ModelKind::Container,
        Some(name),
        Some(school_name),
        ctx.config_arc(),
    );
    container.set_position(position);
    // the derived position from the constructor is not this container's
    // home; re-anchor before the existence check
    container.settle_position();
    // boxed: school creation recurses into container creation
    let created = Box::pin(container.create_without_hooks(ctx, false)).await?;
    if !created {
        debug!(name, position, "container already present");
    }
    Ok(())
}

async fn create_group(
    ctx: &Context,
    name: &str,
    position: &str,
    roles: &[RoleString],
) -> ModelResult<()> {
    let mut group =
        SchoolObject::new(ModelKind::BasicGroup, Some(name), None, ctx.config_arc());
    group.set_position(position);
    group.settle_position();
    if !roles.is_empty() {
        group.set(
            "roles",
            AttributeValue::items(roles.iter().map(|r| r.to_string())),
        );
    }
    let created = Box::pin(group.create_without_hooks(ctx, false)).await?;
    if !created {
        debug!(name, position, "group already present");
    }
    Ok(())
}

/// Name of the per-school admin group
pub fn admin_group_name(school_name: &str, config: &DirectoryConfig) -> String {
    format!("{}{}", config.admin_group_prefix, school_name)
}

fn domain_group_container(config: &DirectoryConfig) -> String {
    format!("cn=ucsschool,cn=groups,{}", config.base_dn)
}

fn admin_group_container(config: &DirectoryConfig) -> String {
    format!("cn=ouadmins,cn=groups,{}", config.base_dn)
}

fn domain_group_names(school_name: &str, config: &DirectoryConfig) -> Vec<String> {
    let mut names = vec![
        format!("OU{school_name}-DC-Edukativnetz"),
        format!("OU{school_name}-Member-Edukativnetz"),
    ];
    if config.administrative_objects {
        names.push(format!("OU{school_name}-DC-Verwaltungsnetz"));
        names.push(format!("OU{school_name}-Member-Verwaltungsnetz"));
    }
    names
}

/// Build the container tree and default groups of a freshly created
/// school OU
pub async fn create_dependent_objects(object: &mut SchoolObject, ctx: &Context) -> ModelResult<()> {
    let Some(name) = object.name() else {
        return Err(ModelError::generic("school has no name"));
    };
    let config = ctx.config();
    let base = SchoolSearchBase::new(&name, ctx.config_arc());
    info!(school = name, "creating school container tree");

    for container in [
        "users", "groups", "shares", "computers", "networks", "printers", "policies", "dhcp",
    ] {
        create_container(ctx, &name, container, base.school_dn()).await?;
    }
    create_container(ctx, &name, &config.containers.students, &base.users()).await?;
    create_container(ctx, &name, &config.containers.teachers, &base.users()).await?;
    create_container(ctx, &name, &config.containers.admins, &base.users()).await?;
    if config.administrative_objects {
        create_container(ctx, &name, &config.containers.staff, &base.users()).await?;
        create_container(ctx, &name, &config.containers.teachers_and_staff, &base.users())
            .await?;
    }
    create_container(ctx, &name, &config.containers.students, &base.groups()).await?;
    create_container(ctx, &name, &config.containers.classes, &base.workgroups()).await?;
    create_container(ctx, &name, &config.containers.rooms, &base.groups()).await?;
    create_container(ctx, &name, &config.containers.classes, &base.shares()).await?;

    // domain-wide replication groups
    create_container(ctx, &name, "groups", &config.base_dn).await?;
    create_container(ctx, &name, "ucsschool", &format!("cn=groups,{}", config.base_dn)).await?;
    for group_name in domain_group_names(&name, config) {
        create_group(ctx, &group_name, &domain_group_container(config), &[]).await?;
    }

    // per-school admin group
    create_container(ctx, &name, "ouadmins", &format!("cn=groups,{}", config.base_dn)).await?;
    create_group(
        ctx,
        &admin_group_name(&name, config),
        &admin_group_container(config),
        &[RoleString::school_context(ROLE_SCHOOL_ADMIN_GROUP, &name)],
    )
    .await?;
    Ok(())
}

/// Delete the domain-wide groups that belong to a removed school.
/// The OU subtree itself is already gone at this point.
pub async fn remove_dependent_objects(object: &mut SchoolObject, ctx: &Context) -> ModelResult<()> {
    let Some(name) = object.name() else {
        return Ok(());
    };
    let config = ctx.config();
    let mut dns: Vec<String> = domain_group_names(&name, config)
        .into_iter()
        .map(|group| format!("cn={},{}", group, domain_group_container(config)))
        .collect();
    dns.push(format!(
        "cn={},{}",
        admin_group_name(&name, config),
        admin_group_container(config)
    ));
    for dn in dns {
        match ctx.directory().delete(&dn, false).await {
            Ok(()) => debug!(dn, "removed school group"),
            Err(DirectoryError::NoSuchEntry { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
