//! shellreg - command registry and resolution engine for interactive shells.
//!
//! A [`CommandRegistry`] maps command names to immutable
//! [`CommandDescriptor`]s. Shell sessions resolve names through the
//! [`CommandResolver`] read path while plugin loaders register and unregister
//! commands concurrently, either blocking or with a completion callback.
//!
//! Registries are scoped to an [`OwningContext`]; the
//! [`SharedRegistryLocator`] hands out one shared registry per context and
//! discards it when the context shuts down.

pub mod builtins;
pub mod command;
mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod locator;
pub mod registry;
pub mod resolver;
pub mod telemetry;

pub use command::{
    CommandDescriptor, CommandHandler, CommandMetadata, CommandOption, CommandProcess,
    DescriptorBuilder,
};
pub use config::Config;
pub use context::{ContextId, OwningContext};
pub use error::{ContextError, ProcessError, ProcessResult, RegistryError};
pub use locator::SharedRegistryLocator;
pub use registry::{BulkPolicy, CommandRegistry, StatsSnapshot};
pub use resolver::{CommandResolver, ResolverChain};
