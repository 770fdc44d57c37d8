// Copyright 2026 Schoolyard Software, LLC.

//! Session configuration
//!
//! Replaces the registry lookups of the original deployment: the LDAP
//! base, the hook root and the container naming scheme are plain data,
//! deserializable from whatever config source the caller uses.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Names of the well-known sub-containers inside a school OU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerNames {
    /// Container for student users and student groups
    pub students: String,
    /// Container for teacher users and teacher groups
    pub teachers: String,
    /// Container for staff users and staff groups
    pub staff: String,
    /// Container for users who are both teachers and staff
    pub teachers_and_staff: String,
    /// Container for school-admin users
    pub admins: String,
    /// Container for class groups
    pub classes: String,
    /// Container for computer-room groups
    pub rooms: String,
}

impl Default for ContainerNames {
    fn default() -> Self {
        Self {
            students: "schueler".to_string(),
            teachers: "lehrer".to_string(),
            staff: "mitarbeiter".to_string(),
            teachers_and_staff: "lehrer und mitarbeiter".to_string(),
            admins: "admins".to_string(),
            classes: "klassen".to_string(),
            rooms: "raeume".to_string(),
        }
    }
}

/// Configuration for one directory session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base DN of the directory tree
    pub base_dn: String,
    /// Root directory holding external hook script directories
    pub hook_root: PathBuf,
    /// Whether school OUs are grouped under district OUs derived from
    /// the first two characters of the school name
    pub district_mode: bool,
    /// Whether administrative (staff) objects are created for schools
    pub administrative_objects: bool,
    /// Capacity of the per-session object cache
    pub cache_capacity: usize,
    /// Sub-container naming scheme
    pub containers: ContainerNames,
    /// Prefix of the per-school admin group name
    pub admin_group_prefix: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_dn: "dc=example,dc=org".to_string(),
            hook_root: PathBuf::from("/var/lib/campus/hooks"),
            district_mode: false,
            administrative_objects: true,
            cache_capacity: 256,
            containers: ContainerNames::default(),
            admin_group_prefix: "admins-".to_string(),
        }
    }
}

impl DirectoryConfig {
    /// Config with a specific base DN, defaults elsewhere
    pub fn with_base(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = DirectoryConfig::default();
        assert_eq!(config.containers.teachers, "lehrer");
        assert!(!config.district_mode);
        assert!(config.cache_capacity > 0);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: DirectoryConfig =
            serde_json::from_str(r#"{"base_dn": "dc=campus,dc=test", "district_mode": true}"#)
                .unwrap();
        assert_eq!(config.base_dn, "dc=campus,dc=test");
        assert!(config.district_mode);
        assert_eq!(config.containers.classes, "klassen");
    }
}
