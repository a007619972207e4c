//! Command descriptors and the handler contract.
//!
//! A [`CommandDescriptor`] binds a name to the [`CommandHandler`] that runs
//! it. Descriptors are immutable once built; the registry only stores and
//! hands them out, the shell front-end is the one that calls
//! [`CommandHandler::process`].

use crate::error::{ProcessError, ProcessResult, RegistryError};
use crate::resolver::CommandResolver;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Execution logic of a command.
///
/// Implementations own their synchronization; the registry never calls them.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command and return its exit status.
    async fn process(&self, process: &CommandProcess<'_>) -> ProcessResult;
}

/// Everything a front-end hands to a running command.
pub struct CommandProcess<'a> {
    /// Name the command was invoked as.
    pub name: &'a str,
    /// Arguments following the command name.
    pub args: &'a [String],
    /// Output sink for this invocation.
    pub stdout: &'a mpsc::Sender<String>,
    /// Resolver the command was found through.
    pub resolver: &'a dyn CommandResolver,
    /// Cancelled when the user interrupts the command (Ctrl-C).
    pub interrupt: CancellationToken,
}

impl CommandProcess<'_> {
    /// Write data to the output sink.
    pub async fn write(&self, data: impl Into<String>) -> Result<(), ProcessError> {
        self.stdout.send(data.into()).await?;
        Ok(())
    }
}

/// A declared command option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    name: String,
    arity: usize,
}

impl CommandOption {
    /// `arity` is the number of values the option consumes.
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Descriptive data attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMetadata {
    /// One-line summary shown by `help`.
    pub summary: Option<String>,
    /// Usage string, e.g. `sleep seconds`.
    pub usage: Option<String>,
    /// Declared options.
    pub options: Vec<CommandOption>,
}

struct DescriptorInner {
    name: String,
    handler: Arc<dyn CommandHandler>,
    metadata: CommandMetadata,
}

/// Immutable record binding a command name to its handler.
///
/// Cloning is cheap and yields the same descriptor: equality is identity,
/// so a descriptor compares equal only to clones of itself.
#[derive(Clone)]
pub struct CommandDescriptor {
    inner: Arc<DescriptorInner>,
}

impl CommandDescriptor {
    /// Build a descriptor with no metadata.
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<Self, RegistryError> {
        Self::builder(name, handler).build()
    }

    /// Start building a descriptor.
    pub fn builder(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            handler,
            metadata: CommandMetadata::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.inner.handler
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.inner.metadata
    }

    /// Validated construction for names known to be well-formed.
    pub(crate) fn from_parts(
        name: &'static str,
        handler: Arc<dyn CommandHandler>,
        metadata: CommandMetadata,
    ) -> Self {
        debug_assert!(validate_name(name).is_ok());
        Self {
            inner: Arc::new(DescriptorInner {
                name: name.to_owned(),
                handler,
                metadata,
            }),
        }
    }
}

impl PartialEq for CommandDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CommandDescriptor {}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.inner.name)
            .field("metadata", &self.inner.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandDescriptor`]; validation happens in [`build`](Self::build).
pub struct DescriptorBuilder {
    name: String,
    handler: Arc<dyn CommandHandler>,
    metadata: CommandMetadata,
}

impl DescriptorBuilder {
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.metadata.summary = Some(summary.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.metadata.usage = Some(usage.into());
        self
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.metadata.options.push(option);
        self
    }

    /// Validate and freeze the descriptor.
    pub fn build(self) -> Result<CommandDescriptor, RegistryError> {
        validate_name(&self.name)?;
        if self.metadata.options.iter().any(|o| o.name.is_empty()) {
            return Err(RegistryError::InvalidCommandDescriptor(format!(
                "command {} declares an option with an empty name",
                self.name
            )));
        }
        Ok(CommandDescriptor {
            inner: Arc::new(DescriptorInner {
                name: self.name,
                handler: self.handler,
                metadata: self.metadata,
            }),
        })
    }
}

/// Names must be non-empty and free of blanks; the front-end splits lines on blanks.
fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::InvalidCommandDescriptor(
            "command name is empty".into(),
        ));
    }
    if name.contains([' ', '\t']) {
        return Err(RegistryError::InvalidCommandDescriptor(format!(
            "command name contains a blank: {name:?}"
        )));
    }
    Ok(())
}
