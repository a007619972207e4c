//! Owning contexts.
//!
//! An [`OwningContext`] is the lifecycle scope a shared registry is bound to
//! (one per running shell service). It owns the completion queue that
//! delivers registry callbacks and runs teardown hooks on shutdown.

use crate::completion::CompletionQueue;
use crate::error::ContextError;
use crate::registry::BulkPolicy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::info;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

type ShutdownHook = Box<dyn FnOnce() + Send + 'static>;

struct ContextInner {
    id: ContextId,
    completions: CompletionQueue,
    shutdown: CancellationToken,
    hooks: Mutex<Option<Vec<ShutdownHook>>>,
    bulk_policy: BulkPolicy,
}

impl ContextInner {
    /// Cancel first so concurrent callers see the shutdown, then run hooks once.
    fn teardown(&self, reason: &'static str) {
        self.shutdown.cancel();
        let Some(hooks) = self.hooks.lock().take() else {
            return;
        };
        info!(context = %self.id, hooks = hooks.len(), reason, "Owning context shutting down");
        for hook in hooks {
            hook();
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.teardown("dropped");
    }
}

/// Lifecycle scope for registries. Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct OwningContext {
    inner: Arc<ContextInner>,
}

impl OwningContext {
    /// Create a context on the current tokio runtime with the default bulk policy.
    pub fn new() -> Result<Self, ContextError> {
        Self::with_policy(BulkPolicy::default())
    }

    /// Create a context on the current tokio runtime.
    pub fn with_policy(bulk_policy: BulkPolicy) -> Result<Self, ContextError> {
        let handle = Handle::try_current().map_err(|_| ContextError::NoRuntime)?;
        Ok(Self::with_handle(&handle, bulk_policy))
    }

    /// Create a context whose completion queue runs on `handle`.
    pub fn with_handle(handle: &Handle, bulk_policy: BulkPolicy) -> Self {
        let shutdown = CancellationToken::new();
        let completions = CompletionQueue::spawn(handle, shutdown.clone());
        let id = ContextId::next();
        info!(context = %id, ?bulk_policy, "Owning context created");
        Self {
            inner: Arc::new(ContextInner {
                id,
                completions,
                shutdown,
                hooks: Mutex::new(Some(Vec::new())),
                bulk_policy,
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Policy applied by registries created for this context.
    pub fn bulk_policy(&self) -> BulkPolicy {
        self.inner.bulk_policy
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Run `hook` when the context shuts down, or now if it already has.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        if let Some(pending) = self.inner.hooks.lock().as_mut() {
            pending.push(Box::new(hook));
            return;
        }
        hook();
    }

    /// Close the completion queue and run teardown hooks. Idempotent.
    ///
    /// Dropping the last handle to a context has the same effect.
    pub fn shutdown(&self) {
        self.inner.teardown("shutdown");
    }

    pub(crate) fn completions(&self) -> &CompletionQueue {
        &self.inner.completions
    }

    /// Token cancelled when the context shuts down or is dropped.
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

impl fmt::Debug for OwningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwningContext")
            .field("id", &self.inner.id)
            .field("bulk_policy", &self.inner.bulk_policy)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_new_outside_runtime_fails() {
        assert_eq!(OwningContext::new().unwrap_err(), ContextError::NoRuntime);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let a = OwningContext::new().unwrap();
        let b = OwningContext::new().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
        assert!(a.id().to_string().starts_with("ctx-"));
    }

    #[tokio::test]
    async fn test_shutdown_runs_hooks_once() {
        let ctx = OwningContext::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        ctx.on_shutdown(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!ctx.is_shut_down());
        ctx.shutdown();
        ctx.shutdown();
        assert!(ctx.is_shut_down());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_runs_hooks() {
        let ctx = OwningContext::new().unwrap();
        let token = ctx.shutdown_token();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        ctx.on_shutdown(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let other = ctx.clone();
        drop(ctx);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        drop(other);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_drop_after_shutdown_does_not_rerun_hooks() {
        let ctx = OwningContext::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        ctx.on_shutdown(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        ctx.shutdown();
        drop(ctx);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_after_shutdown_runs_immediately() {
        let ctx = OwningContext::new().unwrap();
        ctx.shutdown();

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        ctx.on_shutdown(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
