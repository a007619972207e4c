//! Tracing setup and span constructors.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Standardized span constructors for registry observability.
pub mod spans {
    use crate::context::ContextId;
    use crate::registry::BulkPolicy;
    use tracing::{Span, debug_span, info_span};

    /// Span for a single-name registry mutation.
    pub fn mutation(op: &'static str, command: &str, context: ContextId) -> Span {
        debug_span!("registry.mutation", op, command = %command, context = %context)
    }

    /// Span for a bulk registration.
    pub fn bulk(count: usize, policy: BulkPolicy, context: ContextId) -> Span {
        debug_span!("registry.bulk", count, policy = ?policy, context = %context)
    }

    /// Span for running a resolved command.
    pub fn process(command: &str, argc: usize) -> Span {
        info_span!("command.process", command = %command, argc)
    }
}
