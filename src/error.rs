//! Unified error handling for shellreg.
//!
//! Registry operations never panic on bad input: every failure is a value,
//! returned directly from the blocking form or handed to the completion
//! callback of the non-blocking form.

use crate::context::ContextId;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Registry Errors (register / unregister / strict resolution)
// ============================================================================

/// Errors produced by registry mutations and strict lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command already registered: {0}")]
    DuplicateCommand(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid command descriptor: {0}")]
    InvalidCommandDescriptor(String),

    /// The owning context has shut down; the registry no longer accepts changes.
    #[error("registry of {0} has been discarded")]
    Discarded(ContextId),
}

impl RegistryError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCommand(_) => "duplicate_command",
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidCommandDescriptor(_) => "invalid_command_descriptor",
            Self::Discarded(_) => "registry_discarded",
        }
    }

    /// The command name the error refers to, if any.
    pub fn command_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateCommand(name) | Self::UnknownCommand(name) => Some(name),
            Self::InvalidCommandDescriptor(_) | Self::Discarded(_) => None,
        }
    }
}

// ============================================================================
// Context Errors (owning context construction)
// ============================================================================

/// Errors raised while setting up an owning context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// `OwningContext::new` was called outside a tokio runtime.
    #[error("no tokio runtime available for the completion queue")]
    NoRuntime,

    /// The context has shut down and hands out no more registries.
    #[error("owning context {0} has shut down")]
    ShutDown(ContextId),
}

// ============================================================================
// Process Errors (command execution)
// ============================================================================

/// Errors a command handler can report while running.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The output sink was closed by the front-end.
    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<String>),

    #[error("usage: {0}")]
    Usage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for command handlers: the exit status on success.
pub type ProcessResult = Result<i32, ProcessError>;
