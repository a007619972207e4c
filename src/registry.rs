//! Command registry.
//!
//! The `CommandRegistry` owns the name → descriptor mapping of a shell.
//! A single `RwLock` guards the mapping, so a reader sees either all or none
//! of any mutation, bulk registration included.
//!
//! Every mutation exists in two forms: a blocking one returning a `Result`,
//! and a `*_with` form that reports through a callback delivered on the
//! owning context's completion queue.
//!
//! A registry does not keep its context alive. Once the context shuts down
//! or is dropped, every mutation fails with `RegistryError::Discarded`.

use crate::command::CommandDescriptor;
use crate::completion::CompletionQueue;
use crate::context::{ContextId, OwningContext};
use crate::error::{ContextError, RegistryError};
use crate::locator::SharedRegistryLocator;
use crate::resolver::CommandResolver;
use crate::telemetry::spans;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How `register_commands` treats names that collide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPolicy {
    /// Fail on the first collision and insert nothing.
    #[default]
    AllOrNothing,
    /// Insert what fits, skip collisions.
    BestEffort,
}

/// Operation counters for one registry.
#[derive(Debug, Default)]
pub struct RegistryStats {
    registered: AtomicU64,
    unregistered: AtomicU64,
    rejected: AtomicU64,
    resolve_hits: AtomicU64,
    resolve_misses: AtomicU64,
}

/// Point-in-time copy of [`RegistryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub unregistered: u64,
    pub rejected: u64,
    pub resolve_hits: u64,
    pub resolve_misses: u64,
}

impl RegistryStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            resolve_hits: self.resolve_hits.load(Ordering::Relaxed),
            resolve_misses: self.resolve_misses.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

struct RegistryInner {
    commands: RwLock<HashMap<String, CommandDescriptor>>,
    context_id: ContextId,
    completions: CompletionQueue,
    discarded: CancellationToken,
    policy: BulkPolicy,
    stats: RegistryStats,
}

/// Mutable set of commands known by a shell.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct CommandRegistry {
    inner: Arc<RegistryInner>,
}

impl CommandRegistry {
    /// Create an independent registry bound to `context`.
    pub fn new(context: &OwningContext) -> Self {
        Self::with_policy(context, context.bulk_policy())
    }

    /// Create an independent registry with an explicit bulk policy.
    pub fn with_policy(context: &OwningContext, policy: BulkPolicy) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                commands: RwLock::new(HashMap::new()),
                context_id: context.id(),
                completions: context.completions().clone(),
                discarded: context.shutdown_token(),
                policy,
                stats: RegistryStats::default(),
            }),
        }
    }

    /// The shared registry of `context`, from the process-wide locator.
    pub fn get_shared(context: &OwningContext) -> Result<Self, ContextError> {
        SharedRegistryLocator::global().get_shared(context)
    }

    /// A new registry not tracked by any locator.
    pub fn create(context: &OwningContext) -> Self {
        SharedRegistryLocator::global().create(context)
    }

    pub fn context_id(&self) -> ContextId {
        self.inner.context_id
    }

    /// Whether the owning context has gone; a discarded registry rejects mutations.
    pub fn is_discarded(&self) -> bool {
        self.inner.discarded.is_cancelled()
    }

    /// Checked with the write lock held, so no mutation lands after teardown clears the map.
    fn ensure_live(&self) -> Result<(), RegistryError> {
        if self.is_discarded() {
            RegistryStats::bump(&self.inner.stats.rejected, 1);
            let err = RegistryError::Discarded(self.context_id());
            debug!(error = err.error_code(), "Mutation on discarded registry");
            return Err(err);
        }
        Ok(())
    }

    pub fn policy(&self) -> BulkPolicy {
        self.inner.policy
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.commands.read().is_empty()
    }

    /// Whether both handles point at the same registry.
    pub fn same_registry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register one command; fails with `DuplicateCommand` if the name is taken.
    pub fn register_command(&self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        let _span = spans::mutation("register", descriptor.name(), self.context_id()).entered();
        let mut commands = self.inner.commands.write();
        self.ensure_live()?;
        match commands.entry(descriptor.name().to_owned()) {
            Entry::Occupied(slot) => {
                RegistryStats::bump(&self.inner.stats.rejected, 1);
                let err = RegistryError::DuplicateCommand(slot.key().clone());
                debug!(error = err.error_code(), "Registration rejected");
                Err(err)
            }
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                RegistryStats::bump(&self.inner.stats.registered, 1);
                debug!("Command registered");
                Ok(())
            }
        }
    }

    /// Register several commands in order, following the registry's [`BulkPolicy`].
    ///
    /// Returns the descriptors actually inserted.
    pub fn register_commands(
        &self,
        descriptors: Vec<CommandDescriptor>,
    ) -> Result<Vec<CommandDescriptor>, RegistryError> {
        let _span = spans::bulk(descriptors.len(), self.inner.policy, self.context_id()).entered();
        let mut commands = self.inner.commands.write();
        self.ensure_live()?;
        match self.inner.policy {
            BulkPolicy::AllOrNothing => {
                let mut batch = HashSet::with_capacity(descriptors.len());
                for d in &descriptors {
                    if commands.contains_key(d.name()) || !batch.insert(d.name()) {
                        RegistryStats::bump(&self.inner.stats.rejected, 1);
                        let err = RegistryError::DuplicateCommand(d.name().to_owned());
                        debug!(command = %d.name(), error = err.error_code(), "Bulk registration aborted");
                        return Err(err);
                    }
                }
                for d in &descriptors {
                    commands.insert(d.name().to_owned(), d.clone());
                }
                RegistryStats::bump(&self.inner.stats.registered, descriptors.len());
                debug!(count = descriptors.len(), "Commands registered");
                Ok(descriptors)
            }
            BulkPolicy::BestEffort => {
                let mut registered = Vec::with_capacity(descriptors.len());
                for d in descriptors {
                    match commands.entry(d.name().to_owned()) {
                        Entry::Occupied(slot) => {
                            RegistryStats::bump(&self.inner.stats.rejected, 1);
                            debug!(command = %slot.key(), "Skipping duplicate command");
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(d.clone());
                            registered.push(d);
                        }
                    }
                }
                RegistryStats::bump(&self.inner.stats.registered, registered.len());
                debug!(count = registered.len(), "Commands registered");
                Ok(registered)
            }
        }
    }

    /// Remove a command; fails with `UnknownCommand` if the name is absent.
    pub fn unregister_command(&self, name: &str) -> Result<(), RegistryError> {
        let _span = spans::mutation("unregister", name, self.context_id()).entered();
        let mut commands = self.inner.commands.write();
        self.ensure_live()?;
        if commands.remove(name).is_some() {
            RegistryStats::bump(&self.inner.stats.unregistered, 1);
            debug!("Command unregistered");
            Ok(())
        } else {
            RegistryStats::bump(&self.inner.stats.rejected, 1);
            let err = RegistryError::UnknownCommand(name.to_owned());
            debug!(error = err.error_code(), "Unregistration rejected");
            Err(err)
        }
    }

    /// Non-blocking [`register_command`](Self::register_command).
    pub fn register_command_with<F>(&self, descriptor: CommandDescriptor, on_complete: F)
    where
        F: FnOnce(Result<(), RegistryError>) + Send + 'static,
    {
        let result = self.register_command(descriptor);
        self.inner.completions.deliver(result, on_complete);
    }

    /// Non-blocking [`register_commands`](Self::register_commands).
    pub fn register_commands_with<F>(&self, descriptors: Vec<CommandDescriptor>, on_complete: F)
    where
        F: FnOnce(Result<Vec<CommandDescriptor>, RegistryError>) + Send + 'static,
    {
        let result = self.register_commands(descriptors);
        self.inner.completions.deliver(result, on_complete);
    }

    /// Non-blocking [`unregister_command`](Self::unregister_command).
    pub fn unregister_command_with<F>(&self, name: &str, on_complete: F)
    where
        F: FnOnce(Result<(), RegistryError>) + Send + 'static,
    {
        let result = self.unregister_command(name);
        self.inner.completions.deliver(result, on_complete);
    }

    /// Discard every command. Used when the owning context tears down.
    pub(crate) fn clear(&self) -> usize {
        let mut commands = self.inner.commands.write();
        let n = commands.len();
        commands.clear();
        n
    }
}

impl CommandResolver for CommandRegistry {
    fn resolve_command(&self, name: &str) -> Option<CommandDescriptor> {
        let found = self.inner.commands.read().get(name).cloned();
        let counter = if found.is_some() {
            &self.inner.stats.resolve_hits
        } else {
            &self.inner.stats.resolve_misses
        };
        RegistryStats::bump(counter, 1);
        found
    }

    fn command_names(&self) -> BTreeSet<String> {
        self.inner.commands.read().keys().cloned().collect()
    }

    fn commands(&self) -> Vec<CommandDescriptor> {
        let mut all: Vec<_> = self.inner.commands.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("context", &self.context_id())
            .field("policy", &self.inner.policy)
            .field("len", &self.len())
            .finish()
    }
}
