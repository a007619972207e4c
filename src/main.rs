//! shellreg - run a registered shell command once.
//!
//! Usage: `shellreg [command [args...]]` (defaults to `help`).
//! Set `SHELLREG_CONFIG` to a TOML file to override defaults.

use shellreg::{
    CommandDescriptor, CommandProcess, CommandRegistry, CommandResolver, Config, OwningContext,
    builtins, telemetry,
};
use std::ffi::OsString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};

/// Exit status for a command that could not be resolved.
const EXIT_UNKNOWN_COMMAND: i32 = 127;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("SHELLREG_CONFIG") {
        Ok(path) => Config::load(&path).map_err(|e| {
            eprintln!("shellreg: failed to load config {path}: {e}");
            e
        })?,
        Err(_) => Config::default(),
    };

    telemetry::init(&config.logging);

    let context = OwningContext::with_policy(config.registry.bulk_policy)?;
    let registry = CommandRegistry::get_shared(&context)?;

    let mut descriptors = Vec::new();
    for name in &config.builtins.enabled {
        match builtins::by_name(name) {
            Some(descriptor) => descriptors.push(descriptor),
            None => warn!(command = %name, "Unknown builtin in config, skipping"),
        }
    }
    let registered = registry.register_commands(descriptors)?;
    info!(
        context = %context.id(),
        count = registered.len(),
        policy = ?registry.policy(),
        "Builtins registered"
    );

    let (name, args) = parse_argv(std::env::args_os().skip(1))?;

    let status = match registry.resolve_command(&name) {
        Some(descriptor) => run(&registry, &descriptor, &args).await?,
        None => {
            eprintln!("shellreg: unknown command: {name}");
            EXIT_UNKNOWN_COMMAND
        }
    };

    context.shutdown();
    std::process::exit(status);
}

/// Split the command line into a command name (default `help`) and its arguments.
fn parse_argv(argv: impl IntoIterator<Item = OsString>) -> anyhow::Result<(String, Vec<String>)> {
    let mut argv = argv
        .into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow::anyhow!("argument is not valid UTF-8: {arg:?}"))
        })
        .collect::<anyhow::Result<Vec<String>>>()?
        .into_iter();
    let name = argv.next().unwrap_or_else(|| "help".to_string());
    Ok((name, argv.collect()))
}

async fn run(
    registry: &CommandRegistry,
    descriptor: &CommandDescriptor,
    args: &[String],
) -> anyhow::Result<i32> {
    let (stdout_tx, mut stdout_rx) = mpsc::channel::<String>(64);
    let printer = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = stdout_rx.recv().await {
            if stdout.write_all(chunk.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = stdout.flush().await;
    });

    let interrupt = CancellationToken::new();
    let on_ctrl_c = interrupt.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let process = CommandProcess {
        name: descriptor.name(),
        args,
        stdout: &stdout_tx,
        resolver: registry,
        interrupt,
    };
    let span = telemetry::spans::process(descriptor.name(), args.len());
    let result = descriptor.handler().process(&process).instrument(span).await;

    ctrl_c.abort();
    drop(process);
    drop(stdout_tx);
    if let Err(e) = printer.await {
        error!(error = %e, "Output task failed");
    }

    match result {
        Ok(status) => Ok(status),
        Err(e) => {
            error!(command = %descriptor.name(), error = %e, "Command failed");
            Ok(1)
        }
    }
}
