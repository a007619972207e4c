//! Shared registry lookup per owning context.
//!
//! The locator keeps exactly one registry per live [`OwningContext`]. The
//! first `get_shared` for a context creates the registry and hooks its
//! removal into the context's shutdown, so entries never outlive their scope.
//! Dropping the last handle to a context counts as shutdown; registries hold
//! only the context's id, so a tracked entry never keeps its context alive.

use crate::context::{ContextId, OwningContext};
use crate::error::ContextError;
use crate::registry::CommandRegistry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

static GLOBAL: OnceLock<SharedRegistryLocator> = OnceLock::new();

/// Keyed store of shared registries.
#[derive(Clone, Default)]
pub struct SharedRegistryLocator {
    registries: Arc<DashMap<ContextId, CommandRegistry>>,
}

impl SharedRegistryLocator {
    /// Create an empty locator, independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide locator.
    pub fn global() -> &'static SharedRegistryLocator {
        GLOBAL.get_or_init(SharedRegistryLocator::new)
    }

    /// The registry bound to `context`, created on first use.
    ///
    /// Fails with `ContextError::ShutDown` once the context has shut down.
    pub fn get_shared(&self, context: &OwningContext) -> Result<CommandRegistry, ContextError> {
        let id = context.id();
        if context.is_shut_down() {
            warn!(context = %id, "Shared registry requested for a context that has shut down");
            return Err(ContextError::ShutDown(id));
        }

        let mut created = false;
        let registry = self
            .registries
            .entry(id)
            .or_insert_with(|| {
                created = true;
                CommandRegistry::new(context)
            })
            .value()
            .clone();

        if created {
            info!(context = %id, "Shared registry created");
            let registries = Arc::downgrade(&self.registries);
            context.on_shutdown(move || {
                let Some(registries) = registries.upgrade() else {
                    return;
                };
                if let Some((_, registry)) = registries.remove(&id) {
                    let discarded = registry.clear();
                    info!(context = %id, discarded, "Shared registry discarded");
                }
            });
        }

        // Shutdown may have raced the insert; the hook has already removed the entry.
        if context.is_shut_down() {
            return Err(ContextError::ShutDown(id));
        }
        Ok(registry)
    }

    /// A new registry for `context` that this locator does not track.
    ///
    /// On a context that has shut down the registry is born discarded.
    pub fn create(&self, context: &OwningContext) -> CommandRegistry {
        CommandRegistry::new(context)
    }

    /// Whether a shared registry currently exists for `id`.
    pub fn contains(&self, id: ContextId) -> bool {
        self.registries.contains_key(&id)
    }

    /// Number of live shared registries.
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
