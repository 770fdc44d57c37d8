// Copyright 2026 Schoolyard Software, LLC.

//! Lifecycle protocol tests: create, modify, move and remove against an
//! in-memory directory.

use std::sync::Arc;

use campus_domain::{
    Context, DirectoryConfig, MemoryDirectory, ModelError, ModelKind, SchoolObject,
};
use pretty_assertions::assert_eq;

const BASE: &str = "dc=example,dc=org";

fn session() -> (Context, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new(BASE));
    let ctx = Context::new(directory.clone(), DirectoryConfig::with_base(BASE));
    (ctx, directory)
}

async fn create_school(ctx: &Context, name: &str) -> SchoolObject {
    let mut school = SchoolObject::new(ModelKind::School, Some(name), None, ctx.config_arc());
    assert!(school.create(ctx, true).await.unwrap());
    school
}

fn new_teacher(ctx: &Context, name: &str, school: &str) -> SchoolObject {
    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some(name), Some(school), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher
}

#[tokio::test]
async fn teacher_lands_in_the_teacher_container() {
    let (ctx, directory) = session();
    create_school(&ctx, "DEMOSCHOOL").await;

    let mut teacher = new_teacher(&ctx, "t1", "DEMOSCHOOL");
    let expected_dn = "uid=t1,cn=lehrer,cn=users,ou=DEMOSCHOOL,dc=example,dc=org";
    assert_eq!(teacher.dn().as_deref(), Some(expected_dn));

    assert!(teacher.create(&ctx, true).await.unwrap());
    assert!(directory.contains(expected_dn).await);

    let entry = directory.entry(expected_dn).await.unwrap();
    assert_eq!(entry.values("uid"), vec!["t1"]);
    assert_eq!(entry.values("sn"), vec!["Doe"]);
}

#[tokio::test]
async fn create_reports_false_when_already_present() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;

    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    assert!(teacher.create(&ctx, true).await.unwrap());

    let mut again = new_teacher(&ctx, "t1", "Alpha");
    assert!(!again.create(&ctx, true).await.unwrap());
}

#[tokio::test]
async fn modify_reports_success_when_nothing_changed() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    assert!(teacher.modify(&ctx, true, None).await.unwrap());
}

#[tokio::test]
async fn modify_on_missing_entry_reports_false() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "ghost", "Alpha");
    assert!(!teacher.modify(&ctx, true, None).await.unwrap());
}

#[tokio::test]
async fn modify_updates_attributes() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    teacher.set("lastname", "Miller".into());
    assert!(teacher.modify(&ctx, true, None).await.unwrap());

    let entry = directory
        .entry("uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
        .await
        .unwrap();
    assert_eq!(entry.values("sn"), vec!["Miller"]);
}

#[tokio::test]
async fn rename_relocates_the_entry() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    teacher.set_name("t2");
    assert!(teacher.modify(&ctx, true, None).await.unwrap());

    assert!(
        directory
            .contains("uid=t2,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
    assert!(
        !directory
            .contains("uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
    assert_eq!(
        teacher.old_dn(),
        Some("uid=t2,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
    );
}

#[tokio::test]
async fn move_to_own_dn_reports_false() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    assert!(!teacher.move_object(&ctx, None, true).await.unwrap());
}

#[tokio::test]
async fn move_to_missing_school_reports_false() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    teacher.set_school("Nowhere");
    assert!(!teacher.move_object(&ctx, None, true).await.unwrap());
    assert!(
        directory
            .contains("uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn unforced_move_is_refused_for_users() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    create_school(&ctx, "Beta").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    teacher.set_school("Beta");
    assert!(!teacher.move_object(&ctx, None, false).await.unwrap());
}

#[tokio::test]
async fn remove_deletes_and_second_remove_reports_false() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();

    assert!(teacher.remove(&ctx).await.unwrap());
    assert!(
        !directory
            .contains("uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org")
            .await
    );
    assert!(teacher.old_dn().is_none());

    assert!(!teacher.remove(&ctx).await.unwrap());
}

#[tokio::test]
async fn get_all_returns_typed_objects() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    for name in ["t1", "t2"] {
        new_teacher(&ctx, name, "Alpha")
            .create(&ctx, true)
            .await
            .unwrap();
    }
    let mut student =
        SchoolObject::new(ModelKind::Student, Some("s1"), Some("Alpha"), ctx.config_arc());
    student.set("firstname", "Sam".into());
    student.set("lastname", "Sample".into());
    student.create(&ctx, true).await.unwrap();

    let teachers = SchoolObject::get_all(&ctx, ModelKind::Teacher, "Alpha", None, false)
        .await
        .unwrap();
    assert_eq!(teachers.len(), 2);
    assert!(teachers.iter().all(|t| t.kind() == ModelKind::Teacher));

    let students = SchoolObject::get_all(&ctx, ModelKind::Student, "Alpha", None, false)
        .await
        .unwrap();
    assert_eq!(students.len(), 1);
}

#[tokio::test]
async fn easy_filter_searches_all_searchable_attributes() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.set("lastname", "Curie".into());
    teacher.create(&ctx, true).await.unwrap();
    new_teacher(&ctx, "t2", "Alpha")
        .create(&ctx, true)
        .await
        .unwrap();

    let hits = SchoolObject::get_all(&ctx, ModelKind::Teacher, "Alpha", Some("Cur*"), true)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name().as_deref(), Some("t1"));
}

#[tokio::test]
async fn from_dn_verifies_the_kind() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;
    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.create(&ctx, true).await.unwrap();
    let dn = "uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org";

    // abstract query kind accepts sub-kinds
    let loaded = SchoolObject::from_dn(&ctx, ModelKind::User, dn, None)
        .await
        .unwrap();
    assert_eq!(loaded.kind(), ModelKind::Teacher);
    assert_eq!(loaded.get("lastname").as_text(), Some("Doe"));

    // the module filter hides the entry from the wrong kind
    let err = SchoolObject::from_dn(&ctx, ModelKind::Student, dn, None)
        .await
        .unwrap_err();
    assert!(err.is_no_object());

    // direct entry dispatch refuses kind coercion
    let entry = directory.entry(dn).await.unwrap();
    let err = SchoolObject::from_entry(&ctx, ModelKind::Student, entry, None).unwrap_err();
    assert!(matches!(err, ModelError::WrongModel { .. }));
}

#[tokio::test]
async fn get_only_entry_rejects_ambiguity() {
    let (ctx, _) = session();
    create_school(&ctx, "Alpha").await;
    for name in ["t1", "t2"] {
        new_teacher(&ctx, name, "Alpha")
            .create(&ctx, true)
            .await
            .unwrap();
    }

    let single = SchoolObject::get_only_entry(&ctx, ModelKind::Teacher, "(uid=t1)", None)
        .await
        .unwrap();
    assert!(single.is_some());

    let err = SchoolObject::get_only_entry(&ctx, ModelKind::Teacher, "(sn=Doe)", None)
        .await
        .unwrap_err();
    match err {
        ModelError::MultipleObjects { matches, .. } => assert_eq!(matches.len(), 2),
        other => panic!("expected MultipleObjects, got {other}"),
    }
}

#[tokio::test]
async fn to_json_skips_internal_attributes() {
    let (ctx, _) = session();
    let teacher = new_teacher(&ctx, "t1", "Alpha");
    let json = teacher.to_json();
    assert_eq!(json["kind"], "Teacher");
    assert_eq!(
        json["dn"],
        "uid=t1,cn=lehrer,cn=users,ou=Alpha,dc=example,dc=org"
    );
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn repositioned_containers_check_existence_at_the_new_home() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;

    // same name as the cn=groups twin directly below the school OU
    let mut container = SchoolObject::new(
        ModelKind::Container,
        Some("groups"),
        Some("Alpha"),
        ctx.config_arc(),
    );
    container.set_position("cn=shares,ou=Alpha,dc=example,dc=org");
    container.settle_position();
    assert_eq!(
        container.old_dn(),
        Some("cn=groups,cn=shares,ou=Alpha,dc=example,dc=org")
    );

    // the twin must not satisfy the existence check
    assert!(!container.exists(&ctx).await.unwrap());
    assert!(container.create_without_hooks(&ctx, false).await.unwrap());
    assert!(
        directory
            .contains("cn=groups,cn=shares,ou=Alpha,dc=example,dc=org")
            .await
    );
}

#[tokio::test]
async fn persisted_entries_round_trip_through_from_entry() {
    let (ctx, directory) = session();
    create_school(&ctx, "Alpha").await;

    let mut teacher = new_teacher(&ctx, "t1", "Alpha");
    teacher.set("email", "jo.doe@example.org".into());
    teacher.set("birthday", "2001-02-03".into());
    assert!(teacher.create(&ctx, true).await.unwrap());

    let dn = teacher.dn().unwrap();
    let entry = directory.entry(&dn).await.unwrap();
    let loaded = SchoolObject::from_entry(&ctx, ModelKind::Teacher, entry, None).unwrap();

    assert_eq!(loaded.dn().as_deref(), Some(dn.as_str()));
    for attribute in [
        "name",
        "school",
        "firstname",
        "lastname",
        "email",
        "birthday",
        "roles",
    ] {
        assert_eq!(loaded.get(attribute), teacher.get(attribute), "{attribute}");
    }
}
