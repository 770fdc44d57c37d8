// Copyright 2026 Schoolyard Software, LLC.

//! School OU creation: container tree, default groups, district mode
//! and teardown.

use std::sync::Arc;

use campus_domain::{Context, DirectoryConfig, MemoryDirectory, ModelKind, SchoolObject};
use pretty_assertions::assert_eq;

const BASE: &str = "dc=example,dc=org";

fn session_with(config: DirectoryConfig) -> (Context, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new(BASE));
    let ctx = Context::new(directory.clone(), config);
    (ctx, directory)
}

fn session() -> (Context, Arc<MemoryDirectory>) {
    session_with(DirectoryConfig::with_base(BASE))
}

async fn create_school(ctx: &Context, name: &str) -> SchoolObject {
    let mut school = SchoolObject::new(ModelKind::School, Some(name), None, ctx.config_arc());
    assert!(school.create(ctx, true).await.unwrap());
    school
}

#[tokio::test]
async fn school_creation_builds_the_container_tree() {
    let (ctx, directory) = session();
    create_school(&ctx, "DEMOSCHOOL").await;

    for dn in [
        "ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=schueler,cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=lehrer,cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=mitarbeiter,cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=lehrer und mitarbeiter,cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=admins,cn=users,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=schueler,cn=groups,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=klassen,cn=schueler,cn=groups,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=raeume,cn=groups,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=klassen,cn=shares,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=computers,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=dhcp,ou=DEMOSCHOOL,dc=example,dc=org",
        "cn=policies,ou=DEMOSCHOOL,dc=example,dc=org",
    ] {
        assert!(directory.contains(dn).await, "missing container: {dn}");
    }
}

#[tokio::test]
async fn school_creation_builds_default_groups() {
    let (ctx, directory) = session();
    create_school(&ctx, "DEMOSCHOOL").await;

    for dn in [
        "cn=OUDEMOSCHOOL-DC-Edukativnetz,cn=ucsschool,cn=groups,dc=example,dc=org",
        "cn=OUDEMOSCHOOL-Member-Edukativnetz,cn=ucsschool,cn=groups,dc=example,dc=org",
        "cn=OUDEMOSCHOOL-DC-Verwaltungsnetz,cn=ucsschool,cn=groups,dc=example,dc=org",
        "cn=OUDEMOSCHOOL-Member-Verwaltungsnetz,cn=ucsschool,cn=groups,dc=example,dc=org",
    ] {
        assert!(directory.contains(dn).await, "missing group: {dn}");
    }

    let admins = directory
        .entry("cn=admins-DEMOSCHOOL,cn=ouadmins,cn=groups,dc=example,dc=org")
        .await
        .expect("admin group");
    assert_eq!(
        admins.values("campusRole"),
        vec!["school_admin_group:school:DEMOSCHOOL"]
    );
}

#[tokio::test]
async fn shared_containers_coexist_with_their_per_school_twins() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;

    // the per-school groups container must not shadow the domain-level one
    assert!(directory.contains("cn=groups,ou=Alpha,dc=example,dc=org").await);
    assert!(directory.contains("cn=groups,dc=example,dc=org").await);
    assert!(
        directory
            .contains("cn=ucsschool,cn=groups,dc=example,dc=org")
            .await
    );
    assert!(
        directory
            .contains("cn=ouadmins,cn=groups,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn administrative_objects_can_be_disabled() {
    let mut config = DirectoryConfig::with_base(BASE);
    config.administrative_objects = false;
    let (ctx, directory) = session_with(config);
    create_school(&ctx, "Alpha").await;

    assert!(
        !directory
            .contains("cn=mitarbeiter,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
    assert!(
        !directory
            .contains("cn=OUAlpha-DC-Verwaltungsnetz,cn=ucsschool,cn=groups,dc=example,dc=org")
            .await
    );
    assert!(
        directory
            .contains("cn=OUAlpha-DC-Edukativnetz,cn=ucsschool,cn=groups,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn district_mode_groups_schools_under_district_ous() {
    let mut config = DirectoryConfig::with_base(BASE);
    config.district_mode = true;
    let (ctx, directory) = session_with(config);

    let school = create_school(&ctx, "40Amsel").await;
    assert_eq!(
        school.old_dn(),
        Some("ou=40Amsel,ou=40,dc=example,dc=org")
    );
    assert!(directory.contains("ou=40,dc=example,dc=org").await);
    assert!(
        directory
            .contains("cn=lehrer,cn=users,ou=40Amsel,ou=40,dc=example,dc=org")
            .await
    );

    // second school in the same district reuses the district OU
    create_school(&ctx, "40Drossel").await;
    assert!(
        directory
            .contains("ou=40Drossel,ou=40,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn users_follow_the_district_layout() {
    let mut config = DirectoryConfig::with_base(BASE);
    config.district_mode = true;
    let (ctx, directory) = session_with(config);
    create_school(&ctx, "40Amsel").await;

    let mut teacher = SchoolObject::new(
        ModelKind::Teacher,
        Some("t1"),
        Some("40Amsel"),
        ctx.config_arc(),
    );
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.create(&ctx, true).await.unwrap();

    assert!(
        directory
            .contains("uid=t1,cn=lehrer,cn=users,ou=40Amsel,ou=40,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn removing_a_school_takes_its_subtree_and_groups() {
    let (ctx, directory) = session();
    let mut school = create_school(&ctx, "Alpha").await;

    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.create(&ctx, true).await.unwrap();

    assert!(school.remove(&ctx).await.unwrap());

    assert!(!directory.contains("ou=Alpha,dc=example,dc=org").await);
    assert!(
        !directory
            .contains("uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
    assert!(
        !directory
            .contains("cn=admins-Alpha,cn=ouadmins,cn=groups,dc=example,dc=org")
            .await
    );
    assert!(
        !directory
            .contains("cn=OUAlpha-DC-Edukativnetz,cn=ucsschool,cn=groups,dc=example,dc=org")
            .await
    );
    // shared containers stay
    assert!(directory.contains("cn=groups,dc=example,dc=org").await);
    assert!(directory.contains("cn=ucsschool,cn=groups,dc=example,dc=org").await);
}

#[tokio::test]
async fn second_school_coexists_with_the_first() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    create_school(&ctx, "Beta").await;

    assert!(directory.contains("ou=Alpha,dc=example,dc=org").await);
    assert!(directory.contains("ou=Beta,dc=example,dc=org").await);
    assert!(
        directory
            .contains("cn=admins-Beta,cn=ouadmins,cn=groups,dc=example,dc=org")
            .await
    );
}
