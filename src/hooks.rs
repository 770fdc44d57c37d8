// Copyright 2026 Schoolyard Software, LLC.

//! Lifecycle hooks
//!
//! Two hook families attach to the four write operations:
//!
//! * In-process hooks ([`LifecycleHook`]) registered in a
//!   [`HookRegistry`]. Pre-hooks veto an operation by returning an
//!   error; post-hooks run only after a successful core operation.
//! * External script hooks ([`ScriptHookRunner`]): executables in
//!   `<hook_root>/<token>_<operation>_<stage>.d/` invoked with a file
//!   containing the object's tab-separated hook line. Script exit codes
//!   are logged but never veto the operation.
//!
//! Hook bodies receive a context flagged as in-hook; lifecycle calls
//! made with such a context skip hook dispatch instead of recursing.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::errors::ModelResult;
use crate::model::{ModelKind, SchoolObject};

/// The four hookable write operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Entry creation
    Create,
    /// Attribute modification
    Modify,
    /// Relocation to a new DN
    Move,
    /// Entry removal
    Remove,
}

impl Operation {
    /// Name used in hook directory names and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Modify => "modify",
            Operation::Move => "move",
            Operation::Remove => "remove",
        }
    }

    /// Action code carried in hook lines (legacy import format)
    pub fn code(&self) -> &'static str {
        match self {
            Operation::Create => "A",
            Operation::Modify => "M",
            Operation::Move => "MV",
            Operation::Remove => "D",
        }
    }
}

/// Before or after the core operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// Before validation and the directory write
    Pre,
    /// After a successful directory write
    Post,
}

impl HookStage {
    /// Name used in hook directory names
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Pre => "pre",
            HookStage::Post => "post",
        }
    }
}

/// Anything that wants to observe (or veto) lifecycle operations.
///
/// The engine calls every registered sink for every stage of every
/// hooked operation; sinks decide themselves what they care about.
#[async_trait]
pub trait LifecycleEventSink: Send + Sync {
    /// Handle one lifecycle event. An error from a `Pre` event aborts
    /// the operation.
    async fn dispatch(
        &self,
        ctx: &Context,
        stage: HookStage,
        operation: Operation,
        object: &mut SchoolObject,
    ) -> ModelResult<()>;
}

/// Typed in-process hook with one overridable method per stage/operation.
///
/// Default implementations do nothing, so a hook only implements the
/// events it cares about. `target()` limits the hook to one kind and
/// its sub-kinds; `None` receives everything.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Name used in veto errors and log lines
    fn name(&self) -> &'static str;

    /// Kind (including sub-kinds) this hook applies to
    fn target(&self) -> Option<ModelKind> {
        None
    }

    /// Before an object is created
    async fn pre_create(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// After an object was created
    async fn post_create(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// Before an object is modified
    async fn pre_modify(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// After an object was modified
    async fn post_modify(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// Before an object is moved
    async fn pre_move(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// After an object was moved
    async fn post_move(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// Before an object is removed
    async fn pre_remove(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }

    /// After an object was removed
    async fn post_remove(&self, _ctx: &Context, _object: &mut SchoolObject) -> ModelResult<()> {
        Ok(())
    }
}

/// Ordered collection of in-process hooks, dispatched as one sink
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn LifecycleHook>>,
}

impl HookRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in registration order
    pub fn register(&mut self, hook: Box<dyn LifecycleHook>) {
        info!(hook = hook.name(), "registering lifecycle hook");
        self.hooks.push(hook);
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[async_trait]
impl LifecycleEventSink for HookRegistry {
    async fn dispatch(
        &self,
        ctx: &Context,
        stage: HookStage,
        operation: Operation,
        object: &mut SchoolObject,
    ) -> ModelResult<()> {
        for hook in &self.hooks {
            if let Some(target) = hook.target() {
                if !object.kind().is_subkind_of(target) {
                    continue;
                }
            }
            debug!(
                hook = hook.name(),
                stage = stage.as_str(),
                operation = operation.as_str(),
                object = %object,
                "running hook"
            );
            let result = match (stage, operation) {
                (HookStage::Pre, Operation::Create) => hook.pre_create(ctx, object).await,
                (HookStage::Post, Operation::Create) => hook.post_create(ctx, object).await,
                (HookStage::Pre, Operation::Modify) => hook.pre_modify(ctx, object).await,
                (HookStage::Post, Operation::Modify) => hook.post_modify(ctx, object).await,
                (HookStage::Pre, Operation::Move) => hook.pre_move(ctx, object).await,
                (HookStage::Post, Operation::Move) => hook.post_move(ctx, object).await,
                (HookStage::Pre, Operation::Remove) => hook.pre_remove(ctx, object).await,
                (HookStage::Post, Operation::Remove) => hook.post_remove(ctx, object).await,
            };
            if let Err(err) = result {
                warn!(
                    hook = hook.name(),
                    stage = stage.as_str(),
                    operation = operation.as_str(),
                    %err,
                    "hook failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Runs external hook scripts from per-operation directories.
///
/// For a teacher create pre-hook the directory is
/// `<hook_root>/teacher_create_pre.d/`; every executable file in it is
/// run (sorted by name) with one argument, the path of a temp file
/// holding the object's hook line. Post-stage scripts get the entry DN
/// as a second argument. Directories seen empty or absent are memoized
/// and never rechecked within the sink's lifetime.
pub struct ScriptHookRunner {
    hook_root: PathBuf,
    known_empty: Mutex<HashSet<PathBuf>>,
}

impl ScriptHookRunner {
    /// Runner rooted at the given hook directory
    pub fn new(hook_root: impl Into<PathBuf>) -> Self {
        Self {
            hook_root: hook_root.into(),
            known_empty: Mutex::new(HashSet::new()),
        }
    }

    fn hook_dir(&self, token: &str, operation: Operation, stage: HookStage) -> PathBuf {
        self.hook_root
            .join(format!("{token}_{}_{}.d", operation.as_str(), stage.as_str()))
    }

    fn executable_scripts(dir: &PathBuf) -> Vec<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let Ok(read) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut scripts: Vec<PathBuf> = read
            .flatten()
            .map(|e| e.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .metadata()
                        .map(|m| m.permissions().mode() & 0o111 != 0)
                        .unwrap_or(false)
            })
            .collect();
        scripts.sort();
        scripts
    }
}

#[async_trait]
impl LifecycleEventSink for ScriptHookRunner {
    async fn dispatch(
        &self,
        _ctx: &Context,
        stage: HookStage,
        operation: Operation,
        object: &mut SchoolObject,
    ) -> ModelResult<()> {
        let dir = self.hook_dir(object.meta().hook_token, operation, stage);
        {
            let known_empty = self.known_empty.lock().await;
            if known_empty.contains(&dir) {
                return Ok(());
            }
        }
        let scripts = Self::executable_scripts(&dir);
        if scripts.is_empty() {
            debug!(dir = %dir.display(), "no hook scripts, memoizing");
            self.known_empty.lock().await.insert(dir);
            return Ok(());
        }
        let Some(line) = object.build_hook_line(stage, operation) else {
            debug!(object = %object, "kind provides no hook line, skipping scripts");
            return Ok(());
        };

        let mut file = tempfile::NamedTempFile::new().map_err(|err| {
            crate::errors::ModelError::generic(format!("cannot write hook line file: {err}"))
        })?;
        file.write_all(line.as_bytes()).map_err(|err| {
            crate::errors::ModelError::generic(format!("cannot write hook line file: {err}"))
        })?;
        let line_path = file.path().to_path_buf();

        let dn = object.old_dn().map(str::to_string).or_else(|| object.dn());
        for script in scripts {
            info!(script = %script.display(), "running hook script");
            let mut command = tokio::process::Command::new(&script);
            command.arg(&line_path);
            if stage == HookStage::Post {
                if let Some(dn) = &dn {
                    command.arg(dn);
                }
            }
            match command.output().await {
                Ok(output) => {
                    let code = output.status.code().unwrap_or(-1);
                    if code != 0 {
                        warn!(script = %script.display(), code, "hook script failed");
                    } else {
                        debug!(script = %script.display(), "hook script finished");
                    }
                }
                Err(err) => {
                    warn!(script = %script.display(), %err, "hook script could not be run");
                }
            }
        }
        Ok(())
    }
}
