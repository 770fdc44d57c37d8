// Copyright 2026 Schoolyard Software, LLC.

//! The session context
//!
//! A [`Context`] bundles everything one logical session needs: the
//! directory handle, the configuration, the object cache and the
//! registered hook sinks. It is cheap to clone; the clone handed to
//! hook bodies carries the in-hook flag, which is how the engine keeps
//! hooks from re-triggering hook dispatch.

use std::sync::Arc;

use tracing::warn;

use crate::cache::{CacheKey, ObjectCache};
use crate::config::DirectoryConfig;
use crate::directory::Directory;
use crate::errors::ModelResult;
use crate::hooks::{HookStage, LifecycleEventSink, Operation};
use crate::model::{ModelKind, SchoolObject};

/// Shared state of one directory session
#[derive(Clone)]
pub struct Context {
    directory: Arc<dyn Directory>,
    config: Arc<DirectoryConfig>,
    cache: Arc<ObjectCache>,
    sinks: Vec<Arc<dyn LifecycleEventSink>>,
    in_hook: bool,
}

impl Context {
    /// New session over a directory with the given configuration
    pub fn new(directory: Arc<dyn Directory>, config: DirectoryConfig) -> Self {
        let cache = Arc::new(ObjectCache::new(config.cache_capacity));
        Self {
            directory,
            config: Arc::new(config),
            cache,
            sinks: Vec::new(),
            in_hook: false,
        }
    }

    /// Attach a hook sink; sinks run in attachment order
    pub fn with_sink(mut self, sink: Arc<dyn LifecycleEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The directory handle
    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// The session configuration
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Shared handle to the session configuration
    pub fn config_arc(&self) -> Arc<DirectoryConfig> {
        Arc::clone(&self.config)
    }

    /// The session object cache
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Whether this context runs inside a hook body
    pub fn in_hook(&self) -> bool {
        self.in_hook
    }

    /// The context handed to hook bodies: same session, flagged in-hook
    pub fn inside_hook(&self) -> Self {
        let mut ctx = self.clone();
        ctx.in_hook = true;
        ctx
    }

    /// Cached constructor for transient objects.
    ///
    /// Returns a clone of the cached object; per-kind invalidation on
    /// writes keeps stale backing-entry memos from outliving an update.
    pub async fn object(
        &self,
        kind: ModelKind,
        name: &str,
        school: Option<&str>,
    ) -> SchoolObject {
        let mut items: Vec<(&str, &str)> = vec![("name", name)];
        if let Some(school) = school {
            items.push(("school", school));
        }
        let key = CacheKey::new(kind, &items);
        let config = self.config_arc();
        self.cache
            .get_or_insert_with(key, || SchoolObject::new(kind, Some(name), school, config))
            .await
    }

    /// Cached School object for a school name
    pub async fn cached_school(&self, name: &str) -> SchoolObject {
        self.object(ModelKind::School, name, None).await
    }

    /// Run every registered sink for one lifecycle event.
    ///
    /// Sinks receive the in-hook clone of this context. A sink error on
    /// the `Pre` stage aborts the operation; the caller never reaches
    /// the core write.
    pub async fn dispatch_hooks(
        &self,
        stage: HookStage,
        operation: Operation,
        object: &mut SchoolObject,
    ) -> ModelResult<()> {
        if self.sinks.is_empty() {
            return Ok(());
        }
        if self.in_hook {
            warn!(
                operation = operation.as_str(),
                "hook dispatch requested from within a hook, skipping"
            );
            return Ok(());
        }
        let hook_ctx = self.inside_hook();
        for sink in &self.sinks {
            sink.dispatch(&hook_ctx, stage, operation, object).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    #[tokio::test]
    async fn hook_context_is_flagged() {
        let directory = Arc::new(MemoryDirectory::new("dc=example,dc=org"));
        let ctx = Context::new(directory, DirectoryConfig::default());
        assert!(!ctx.in_hook());
        assert!(ctx.inside_hook().in_hook());
        // the original is untouched
        assert!(!ctx.in_hook());
    }

    #[tokio::test]
    async fn object_constructor_is_cached() {
        let directory = Arc::new(MemoryDirectory::new("dc=example,dc=org"));
        let ctx = Context::new(directory, DirectoryConfig::default());
        let a = ctx.cached_school("Alpha").await;
        let _b = ctx.cached_school("Alpha").await;
        assert_eq!(ctx.cache().len().await, 1);
        assert_eq!(a.name().as_deref(), Some("Alpha"));
    }
}
