//! Read-only command lookup.

use crate::command::CommandDescriptor;
use crate::error::RegistryError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Read path of a command set.
///
/// Lookups never wait on command logic and never fail; absence is `None`.
pub trait CommandResolver: Send + Sync {
    /// Current descriptor for `name`, if any.
    fn resolve_command(&self, name: &str) -> Option<CommandDescriptor>;

    /// Snapshot of the names known at call time.
    fn command_names(&self) -> BTreeSet<String>;

    /// Snapshot of all descriptors, sorted by name.
    fn commands(&self) -> Vec<CommandDescriptor> {
        self.command_names()
            .iter()
            .filter_map(|name| self.resolve_command(name))
            .collect()
    }

    /// Like [`resolve_command`](Self::resolve_command) but reports absence as `UnknownCommand`.
    fn require_command(&self, name: &str) -> Result<CommandDescriptor, RegistryError> {
        self.resolve_command(name)
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_owned()))
    }
}

/// Ordered stack of resolvers; the first one that knows a name wins.
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn CommandResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver with lower priority than those already present.
    pub fn push(&mut self, resolver: Arc<dyn CommandResolver>) {
        self.resolvers.push(resolver);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, resolver: Arc<dyn CommandResolver>) -> Self {
        self.push(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl CommandResolver for ResolverChain {
    fn resolve_command(&self, name: &str) -> Option<CommandDescriptor> {
        self.resolvers.iter().find_map(|r| r.resolve_command(name))
    }

    fn command_names(&self) -> BTreeSet<String> {
        self.resolvers
            .iter()
            .flat_map(|r| r.command_names())
            .collect()
    }
}
