// Copyright 2026 Schoolyard Software, LLC.

//! Validation behavior: per-field error maps, warnings, and the rules
//! that block writes.

use std::sync::Arc;

use campus_domain::{
    Context, DirectoryConfig, MemoryDirectory, ModelError, ModelKind, SchoolObject,
};
use pretty_assertions::assert_eq;

const BASE: &str = "dc=example,dc=org";

fn session() -> Context {
    let directory = Arc::new(MemoryDirectory::new(BASE));
    Context::new(directory, DirectoryConfig::with_base(BASE))
}

async fn create_school(ctx: &Context, name: &str) -> SchoolObject {
    let mut school = SchoolObject::new(ModelKind::School, Some(name), None, ctx.config_arc());
    assert!(school.create(ctx, true).await.unwrap());
    school
}

#[tokio::test]
async fn missing_required_fields_block_create() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut student =
        SchoolObject::new(ModelKind::Student, Some("s1"), Some("Alpha"), ctx.config_arc());
    let err = student.create(&ctx, true).await.unwrap_err();
    match err {
        ModelError::Validation(validation) => {
            assert!(validation.errors.contains_key("firstname"));
            assert!(validation.errors.contains_key("lastname"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn bad_username_syntax_is_an_error() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut student =
        SchoolObject::new(ModelKind::Student, Some("Not Valid"), Some("Alpha"), ctx.config_arc());
    student.set("firstname", "Sam".into());
    student.set("lastname", "Sample".into());
    student.validate(&ctx, false).await.unwrap();
    assert!(student.errors().contains_key("name"));
}

#[tokio::test]
async fn unknown_school_is_an_error() {
    let ctx = session();
    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Nowhere"), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.validate(&ctx, false).await.unwrap();
    let messages = teacher.errors().get("school").expect("school error");
    assert!(messages[0].contains("\"Nowhere\" does not exist"));
}

#[tokio::test]
async fn name_reuse_across_schools_is_an_error() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;
    create_school(&ctx, "Beta").await;

    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.create(&ctx, true).await.unwrap();

    let mut clash =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Beta"), ctx.config_arc());
    clash.set("firstname", "Jo".into());
    clash.set("lastname", "Doe".into());
    clash.validate(&ctx, false).await.unwrap();
    assert!(clash.errors().contains_key("name"));
}

#[tokio::test]
async fn class_names_must_carry_the_school_prefix() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut class =
        SchoolObject::new(ModelKind::SchoolClass, Some("1a"), Some("Alpha"), ctx.config_arc());
    class.validate(&ctx, false).await.unwrap();
    assert!(class.errors().contains_key("name"));

    let mut prefixed =
        SchoolObject::new(ModelKind::SchoolClass, Some("Alpha-1a"), Some("Alpha"), ctx.config_arc());
    prefixed.validate(&ctx, false).await.unwrap();
    assert!(prefixed.errors().is_empty());
}

#[tokio::test]
async fn bad_role_strings_are_errors() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.set("roles", campus_domain::AttributeValue::items(["nonsense"]));
    teacher.validate(&ctx, false).await.unwrap();
    assert!(teacher.errors().contains_key("roles"));
}

#[tokio::test]
async fn unlikely_changes_warn_but_do_not_block() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut teacher =
        SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), ctx.config_arc());
    teacher.set("firstname", "Jo".into());
    teacher.set("lastname", "Doe".into());
    teacher.set("email", "jo@school.example".into());
    teacher.create(&ctx, true).await.unwrap();

    teacher.set("email", "new@school.example".into());
    assert!(teacher.modify(&ctx, true, None).await.unwrap());
    assert!(teacher.warnings().contains_key("email"));
    assert!(teacher.errors().is_empty());
}

#[tokio::test]
async fn validate_clears_stale_messages() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut student =
        SchoolObject::new(ModelKind::Student, Some("s1"), Some("Alpha"), ctx.config_arc());
    student.validate(&ctx, false).await.unwrap();
    assert!(!student.errors().is_empty());

    student.set("firstname", "Sam".into());
    student.set("lastname", "Sample".into());
    student.validate(&ctx, false).await.unwrap();
    assert!(student.errors().is_empty());
}

#[tokio::test]
async fn error_message_uses_field_labels() {
    let ctx = session();
    let mut student = SchoolObject::new(ModelKind::Student, None, None, ctx.config_arc());
    student.validate(&ctx, false).await.unwrap();
    let message = student.error_message();
    assert!(message.contains("Username"));
    assert!(message.contains("First name"));
}

#[tokio::test]
async fn validation_failure_leaves_directory_untouched() {
    let ctx = session();
    create_school(&ctx, "Alpha").await;

    let mut student =
        SchoolObject::new(ModelKind::Student, Some("s1"), Some("Alpha"), ctx.config_arc());
    assert!(student.create(&ctx, true).await.is_err());
    assert_eq!(
        SchoolObject::get_all(&ctx, ModelKind::Student, "Alpha", None, false)
            .await
            .unwrap()
            .len(),
        0
    );
}
