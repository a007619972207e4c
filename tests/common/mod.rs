//! Integration test common infrastructure.
//!
//! Provides a no-op handler and descriptor helpers shared by the test files.

use async_trait::async_trait;
use shellreg::{CommandDescriptor, CommandHandler, CommandProcess, ProcessResult};
use std::sync::Arc;

/// Handler that does nothing and succeeds.
pub struct NoopHandler;

#[async_trait]
impl CommandHandler for NoopHandler {
    async fn process(&self, _process: &CommandProcess<'_>) -> ProcessResult {
        Ok(0)
    }
}

/// Descriptor named `name` with a no-op handler.
pub fn descriptor(name: &str) -> CommandDescriptor {
    CommandDescriptor::new(name, Arc::new(NoopHandler)).expect("valid test command name")
}

/// `count` descriptors named `{prefix}-0`, `{prefix}-1`, ...
#[allow(dead_code)]
pub fn descriptors(prefix: &str, count: usize) -> Vec<CommandDescriptor> {
    (0..count).map(|i| descriptor(&format!("{prefix}-{i}"))).collect()
}
