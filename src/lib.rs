// Copyright 2026 Schoolyard Software, LLC.

//! # Campus Domain
//!
//! Lifecycle engine for school directory objects: schools, users,
//! groups and containers living in an LDAP-like tree.
//!
//! The central type is [`SchoolObject`]: a typed attribute bag whose DN
//! is recomputed on every access from its name and container position.
//! When the computed DN diverges from the last persisted one, the
//! object has a pending move. The four write operations — create,
//! modify, move, remove — share one protocol: pre-hooks, validation,
//! the directory write, post-hooks.
//!
//! ## Building blocks
//!
//! - **Directory seam**: the [`Directory`] trait abstracts the store;
//!   [`MemoryDirectory`] backs tests and fixtures
//! - **Kinds**: [`ModelKind`] dispatches entries to concrete object
//!   kinds by role strings and container position
//! - **Hooks**: in-process [`hooks::LifecycleHook`]s can veto
//!   operations; external scripts observe them
//! - **Roles**: `role:context_type:context` strings kept in sync with
//!   school membership across create, modify and move
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use campus_domain::{
//!     Context, DirectoryConfig, MemoryDirectory, ModelKind, SchoolObject,
//! };
//!
//! # async fn demo() -> campus_domain::ModelResult<()> {
//! let directory = Arc::new(MemoryDirectory::new("dc=example,dc=org"));
//! let ctx = Context::new(directory, DirectoryConfig::default());
//!
//! let mut school = SchoolObject::new(
//!     ModelKind::School, Some("Alpha"), None, ctx.config_arc(),
//! );
//! school.create(&ctx, true).await?;
//!
//! let mut teacher = SchoolObject::new(
//!     ModelKind::Teacher, Some("t1"), Some("Alpha"), ctx.config_arc(),
//! );
//! teacher.set("firstname", "Jo".into());
//! teacher.set("lastname", "Doe".into());
//! teacher.create(&ctx, true).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod attribute;
pub mod cache;
pub mod config;
pub mod context;
pub mod directory;
pub mod dn;
pub mod errors;
pub mod filter;
pub mod hooks;
pub mod members;
pub mod model;
pub mod roles;
pub mod school;

pub use attribute::{AttributeDescriptor, AttributeValue, Syntax};
pub use cache::{CacheKey, ObjectCache};
pub use config::{ContainerNames, DirectoryConfig};
pub use context::Context;
pub use directory::{Directory, DirectoryEntry, MemoryDirectory, SearchScope};
pub use errors::{DirectoryError, ModelError, ModelResult, ValidationError};
pub use hooks::{
    HookRegistry, HookStage, LifecycleEventSink, LifecycleHook, Operation, ScriptHookRunner,
};
pub use model::{ModelKind, ObjectMeta, SchoolObject};
pub use roles::RoleString;
pub use school::SchoolSearchBase;
