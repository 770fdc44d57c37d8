// Copyright 2026 Schoolyard Software, LLC.

//! The kind registry
//!
//! Static metadata for every [`ModelKind`]: attribute tables, directory
//! module tags, hook tokens, default roles and the entry-to-kind
//! dispatch used when loading objects back from the directory. Concrete
//! user and group kinds are told apart by their role strings first and
//! their container position second.

use crate::attribute::{AttributeDescriptor, Syntax};
use crate::config::DirectoryConfig;
use crate::directory::DirectoryEntry;
use crate::dn::explode_dn;
use crate::hooks::{HookStage, Operation};
use crate::model::{ModelKind, ObjectMeta, SchoolObject};
use crate::roles::{
    ROLE_COMPUTER_ROOM, ROLE_SCHOOL_ADMIN, ROLE_SCHOOL_CLASS, ROLE_STAFF, ROLE_STUDENT,
    ROLE_TEACHER, ROLE_WORKGROUP,
};
use crate::school;

/// Directory attribute carrying role strings
pub const ROLE_ATTRIBUTE: &str = "campusRole";

const USER_ATTRS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("name", "Username")
        .directory("uid")
        .required()
        .unlikely_to_change()
        .searchable()
        .syntax(Syntax::Username),
    AttributeDescriptor::new("school", "School").syntax(Syntax::SchoolName),
    AttributeDescriptor::new("schools", "Schools")
        .directory("campusSchool")
        .multi()
        .syntax(Syntax::SchoolName),
    AttributeDescriptor::new("firstname", "First name")
        .directory("givenName")
        .required()
        .searchable(),
    AttributeDescriptor::new("lastname", "Last name")
        .directory("sn")
        .required()
        .searchable(),
    AttributeDescriptor::new("email", "Email")
        .directory("mailPrimaryAddress")
        .unlikely_to_change()
        .searchable()
        .syntax(Syntax::Email),
    AttributeDescriptor::new("birthday", "Birthday")
        .directory("birthday")
        .unlikely_to_change()
        .syntax(Syntax::Date),
    AttributeDescriptor::new("password", "Password").internal(),
    AttributeDescriptor::new("disabled", "Disabled").directory("campusDisabled"),
    AttributeDescriptor::new("roles", "Roles")
        .directory(ROLE_ATTRIBUTE)
        .multi()
        .syntax(Syntax::RoleString),
];

const GROUP_ATTRS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("name", "Name")
        .directory("cn")
        .required()
        .searchable()
        .syntax(Syntax::CommonName),
    AttributeDescriptor::new("school", "School").syntax(Syntax::SchoolName),
    AttributeDescriptor::new("description", "Description")
        .directory("description")
        .searchable(),
    AttributeDescriptor::new("users", "Users")
        .directory("uniqueMember")
        .multi(),
    AttributeDescriptor::new("roles", "Roles")
        .directory(ROLE_ATTRIBUTE)
        .multi()
        .syntax(Syntax::RoleString),
];

const ROOM_ATTRS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("name", "Name")
        .directory("cn")
        .required()
        .searchable()
        .syntax(Syntax::CommonName),
    AttributeDescriptor::new("school", "School").syntax(Syntax::SchoolName),
    AttributeDescriptor::new("description", "Description")
        .directory("description")
        .searchable(),
    AttributeDescriptor::new("hosts", "Hosts")
        .directory("uniqueMember")
        .multi(),
    AttributeDescriptor::new("roles", "Roles")
        .directory(ROLE_ATTRIBUTE)
        .multi()
        .syntax(Syntax::RoleString),
];

const SCHOOL_ATTRS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("name", "School name")
        .directory("ou")
        .required()
        .unlikely_to_change()
        .searchable()
        .syntax(Syntax::SchoolName),
    AttributeDescriptor::new("display_name", "Display name")
        .directory("displayName")
        .searchable(),
    AttributeDescriptor::new("dc_name", "Educational server").syntax(Syntax::HostName),
    AttributeDescriptor::new("dc_name_administrative", "Administrative server")
        .syntax(Syntax::HostName),
    AttributeDescriptor::new("class_share_file_server", "Class share file server")
        .directory("campusClassShareFileServer")
        .syntax(Syntax::HostName),
    AttributeDescriptor::new("home_share_file_server", "Home share file server")
        .directory("campusHomeShareFileServer")
        .syntax(Syntax::HostName),
];

const CONTAINER_ATTRS: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("name", "Name")
        .directory("cn")
        .required()
        .syntax(Syntax::CommonName),
    AttributeDescriptor::new("school", "School").syntax(Syntax::SchoolName),
];

static SCHOOL_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::School,
    module: "container/ou",
    hook_token: "ou",
    name_key: "ou",
    name_is_unique: false,
    allow_school_change: false,
    supports_school: false,
    supports_schools: false,
    module_filter: None,
    attributes: SCHOOL_ATTRS,
    default_roles: &[],
};

static USER_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::User,
    module: "users/user",
    hook_token: "user",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: None,
    attributes: USER_ATTRS,
    default_roles: &[],
};

static TEACHER_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::Teacher,
    module: "users/user",
    hook_token: "teacher",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: Some("campusRole=teacher:*"),
    attributes: USER_ATTRS,
    default_roles: &[ROLE_TEACHER],
};

static STUDENT_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::Student,
    module: "users/user",
    hook_token: "student",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: Some("campusRole=student:*"),
    attributes: USER_ATTRS,
    default_roles: &[ROLE_STUDENT],
};

static STAFF_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::Staff,
    module: "users/user",
    hook_token: "staff",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: Some("campusRole=staff:*"),
    attributes: USER_ATTRS,
    default_roles: &[ROLE_STAFF],
};

static TEACHER_AND_STAFF_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::TeacherAndStaff,
    module: "users/user",
    hook_token: "teacher_and_staff",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: Some("&(campusRole=teacher:*)(campusRole=staff:*)"),
    attributes: USER_ATTRS,
    default_roles: &[ROLE_TEACHER, ROLE_STAFF],
};

static SCHOOL_ADMIN_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::SchoolAdmin,
    module: "users/user",
    hook_token: "school_admin",
    name_key: "uid",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: true,
    module_filter: Some("campusRole=school_admin:*"),
    attributes: USER_ATTRS,
    default_roles: &[ROLE_SCHOOL_ADMIN],
};

static GROUP_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::Group,
    module: "groups/group",
    hook_token: "group",
    name_key: "cn",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: false,
    module_filter: None,
    attributes: GROUP_ATTRS,
    default_roles: &[],
};

static BASIC_GROUP_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::BasicGroup,
    module: "groups/group",
    hook_token: "group",
    name_key: "cn",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: false,
    supports_schools: false,
    module_filter: None,
    attributes: GROUP_ATTRS,
    default_roles: &[],
};

static SCHOOL_CLASS_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::SchoolClass,
    module: "groups/group",
    hook_token: "school_class",
    name_key: "cn",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: false,
    module_filter: Some("campusRole=school_class:*"),
    attributes: GROUP_ATTRS,
    default_roles: &[ROLE_SCHOOL_CLASS],
};

static WORK_GROUP_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::WorkGroup,
    module: "groups/group",
    hook_token: "workgroup",
    name_key: "cn",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: false,
    module_filter: Some("campusRole=workgroup:*"),
    attributes: GROUP_ATTRS,
    default_roles: &[ROLE_WORKGROUP],
};

static COMPUTER_ROOM_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::ComputerRoom,
    module: "groups/group",
    hook_token: "computer_room",
    name_key: "cn",
    name_is_unique: true,
    allow_school_change: false,
    supports_school: true,
    supports_schools: false,
    module_filter: Some("campusRole=computer_room:*"),
    attributes: ROOM_ATTRS,
    default_roles: &[ROLE_COMPUTER_ROOM],
};

static CONTAINER_META: ObjectMeta = ObjectMeta {
    kind: ModelKind::Container,
    module: "container/cn",
    hook_token: "container",
    name_key: "cn",
    name_is_unique: false,
    allow_school_change: false,
    supports_school: true,
    supports_schools: false,
    module_filter: None,
    attributes: CONTAINER_ATTRS,
    default_roles: &[],
};

/// Static metadata for a kind
pub fn meta_for(kind: ModelKind) -> &'static ObjectMeta {
    match kind {
        ModelKind::School => &SCHOOL_META,
        ModelKind::User => &USER_META,
        ModelKind::Teacher => &TEACHER_META,
        ModelKind::Student => &STUDENT_META,
        ModelKind::Staff => &STAFF_META,
        ModelKind::TeacherAndStaff => &TEACHER_AND_STAFF_META,
        ModelKind::SchoolAdmin => &SCHOOL_ADMIN_META,
        ModelKind::Group => &GROUP_META,
        ModelKind::BasicGroup => &BASIC_GROUP_META,
        ModelKind::SchoolClass => &SCHOOL_CLASS_META,
        ModelKind::WorkGroup => &WORK_GROUP_META,
        ModelKind::ComputerRoom => &COMPUTER_ROOM_META,
        ModelKind::Container => &CONTAINER_META,
    }
}

fn entry_roles(entry: &DirectoryEntry) -> Vec<String> {
    entry
        .values(ROLE_ATTRIBUTE)
        .iter()
        .filter_map(|value| value.split(':').next().map(str::to_string))
        .collect()
}

fn container_of(entry: &DirectoryEntry) -> Option<String> {
    // the cn= component directly above the entry
    explode_dn(&entry.dn)
        .into_iter()
        .nth(1)
        .and_then(|rdn| rdn.strip_prefix("cn=").map(str::to_string))
}

/// Resolve the concrete kind of a directory entry.
///
/// Role strings decide first; entries without usable roles fall back to
/// their container position. `None` means no registered kind matches —
/// callers turn that into `UnknownModel`.
pub fn kind_for_entry(entry: &DirectoryEntry, config: &DirectoryConfig) -> Option<ModelKind> {
    match entry.module.as_str() {
        "container/ou" => Some(ModelKind::School),
        "container/cn" | "container/dc" => Some(ModelKind::Container),
        "users/user" => {
            let roles = entry_roles(entry);
            let has = |role: &str| roles.iter().any(|r| r == role);
            if has(ROLE_TEACHER) && has(ROLE_STAFF) {
                return Some(ModelKind::TeacherAndStaff);
            }
            if has(ROLE_TEACHER) {
                return Some(ModelKind::Teacher);
            }
            if has(ROLE_STUDENT) {
                return Some(ModelKind::Student);
            }
            if has(ROLE_STAFF) {
                return Some(ModelKind::Staff);
            }
            if has(ROLE_SCHOOL_ADMIN) {
                return Some(ModelKind::SchoolAdmin);
            }
            let names = &config.containers;
            match container_of(entry)?.as_str() {
                c if c == names.teachers_and_staff => Some(ModelKind::TeacherAndStaff),
                c if c == names.teachers => Some(ModelKind::Teacher),
                c if c == names.students => Some(ModelKind::Student),
                c if c == names.staff => Some(ModelKind::Staff),
                c if c == names.admins => Some(ModelKind::SchoolAdmin),
                _ => None,
            }
        }
        "groups/group" => {
            let roles = entry_roles(entry);
            let has = |role: &str| roles.iter().any(|r| r == role);
            if has(ROLE_SCHOOL_CLASS) {
                return Some(ModelKind::SchoolClass);
            }
            if has(ROLE_WORKGROUP) {
                return Some(ModelKind::WorkGroup);
            }
            if has(ROLE_COMPUTER_ROOM) {
                return Some(ModelKind::ComputerRoom);
            }
            let names = &config.containers;
            match container_of(entry) {
                Some(c) if c == names.classes => Some(ModelKind::SchoolClass),
                Some(c) if c == names.rooms => Some(ModelKind::ComputerRoom),
                Some(c) if c == names.students => Some(ModelKind::WorkGroup),
                _ => Some(ModelKind::BasicGroup),
            }
        }
        _ => None,
    }
}

/// Kind-specific validation rules, called from `validate()`
pub fn validate_kind_rules(object: &mut SchoolObject) {
    match object.kind() {
        ModelKind::SchoolClass => {
            if let (Some(name), Some(school_name)) = (object.name(), object.school()) {
                let prefix = format!("{school_name}-");
                if !name.starts_with(&prefix) {
                    object.add_error(
                        "name",
                        format!("Class names must start with the school name: \"{prefix}\"."),
                    );
                }
            }
        }
        ModelKind::School => school::validate_school(object),
        _ => {}
    }
}

/// Prefix a class name with its school, unless already prefixed
pub fn prefixed_class_name(school_name: &str, name: &str) -> String {
    let prefix = format!("{school_name}-");
    if name.starts_with(&prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Render the tab-separated hook line consumed by external scripts.
///
/// Kinds without a line format return `None` and skip script hooks
/// entirely.
pub fn build_hook_line(
    object: &SchoolObject,
    _stage: HookStage,
    operation: Operation,
) -> Option<String> {
    let fields: Vec<String> = match object.kind() {
        ModelKind::Teacher
        | ModelKind::Student
        | ModelKind::Staff
        | ModelKind::TeacherAndStaff
        | ModelKind::SchoolAdmin => vec![
            operation.code().to_string(),
            object.name().unwrap_or_default(),
            object.get("lastname").as_text().unwrap_or_default().to_string(),
            object.get("firstname").as_text().unwrap_or_default().to_string(),
            object.school().unwrap_or_default(),
        ],
        ModelKind::SchoolClass | ModelKind::WorkGroup => vec![
            operation.code().to_string(),
            object.name().unwrap_or_default(),
            object.school().unwrap_or_default(),
            object
                .get("description")
                .as_text()
                .unwrap_or_default()
                .to_string(),
        ],
        ModelKind::School => vec![
            operation.code().to_string(),
            object.name().unwrap_or_default(),
            object
                .get("display_name")
                .as_text()
                .unwrap_or_default()
                .to_string(),
        ],
        _ => return None,
    };
    Some(format!("{}\n", fields.join("\t")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user_entry(dn: &str, roles: &[&str]) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new(dn, "users/user");
        entry.set(
            ROLE_ATTRIBUTE,
            roles.iter().map(|r| r.to_string()).collect(),
        );
        entry
    }

    #[test]
    fn roles_decide_user_kinds() {
        let config = DirectoryConfig::default();
        let teacher = user_entry(
            "uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org",
            &["teacher:school:Alpha"],
        );
        assert_eq!(kind_for_entry(&teacher, &config), Some(ModelKind::Teacher));

        let both = user_entry(
            "uid=x1,cn=lehrer und mitarbeiter,cn=users,ou=Alpha,dc=example,dc=org",
            &["teacher:school:Alpha", "staff:school:Alpha"],
        );
        assert_eq!(
            kind_for_entry(&both, &config),
            Some(ModelKind::TeacherAndStaff)
        );
    }

    #[test]
    fn position_decides_when_roles_are_missing() {
        let config = DirectoryConfig::default();
        let student = user_entry("uid=s1,cn=schueler,cn=users,ou=Alpha,dc=example,dc=org", &[]);
        assert_eq!(kind_for_entry(&student, &config), Some(ModelKind::Student));

        let stray = user_entry("uid=s1,cn=elsewhere,ou=Alpha,dc=example,dc=org", &[]);
        assert_eq!(kind_for_entry(&stray, &config), None);
    }

    #[test]
    fn groups_fall_back_to_basic_group() {
        let config = DirectoryConfig::default();
        let mut group = DirectoryEntry::new(
            "cn=custom,cn=groups,ou=Alpha,dc=example,dc=org",
            "groups/group",
        );
        group.set_one("cn", "custom");
        assert_eq!(kind_for_entry(&group, &config), Some(ModelKind::BasicGroup));
    }

    #[test]
    fn class_name_prefixing_is_idempotent() {
        assert_eq!(prefixed_class_name("Alpha", "1a"), "Alpha-1a");
        assert_eq!(prefixed_class_name("Alpha", "Alpha-1a"), "Alpha-1a");
    }

    #[test]
    fn hook_lines_are_tab_separated() {
        let config = Arc::new(DirectoryConfig::default());
        let mut teacher =
            SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), config);
        teacher.set("firstname", "Jo".into());
        teacher.set("lastname", "Doe".into());
        let line = build_hook_line(&teacher, HookStage::Pre, Operation::Create).unwrap();
        assert_eq!(line, "A\tt1\tDoe\tJo\tAlpha\n");
    }

    #[test]
    fn containers_have_no_hook_line() {
        let config = Arc::new(DirectoryConfig::default());
        let container =
            SchoolObject::new(ModelKind::Container, Some("users"), Some("Alpha"), config);
        assert!(build_hook_line(&container, HookStage::Post, Operation::Remove).is_none());
    }
}
