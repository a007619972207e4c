//! Base commands every shell starts with.

use crate::command::{CommandDescriptor, CommandHandler, CommandMetadata, CommandProcess};
use crate::error::ProcessResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Names of all base commands.
pub const NAMES: [&str; 4] = ["echo", "help", "ls", "sleep"];

/// Descriptor for the base command called `name`.
pub fn by_name(name: &str) -> Option<CommandDescriptor> {
    match name {
        "echo" => Some(echo()),
        "help" => Some(help()),
        "ls" => Some(ls()),
        "sleep" => Some(sleep()),
        _ => None,
    }
}

/// Descriptors for every base command.
pub fn all() -> Vec<CommandDescriptor> {
    vec![echo(), help(), ls(), sleep()]
}

pub fn echo() -> CommandDescriptor {
    CommandDescriptor::from_parts(
        "echo",
        Arc::new(EchoHandler),
        CommandMetadata {
            summary: Some("write arguments to the output".into()),
            usage: Some("echo [text...]".into()),
            options: Vec::new(),
        },
    )
}

pub fn help() -> CommandDescriptor {
    CommandDescriptor::from_parts(
        "help",
        Arc::new(HelpHandler),
        CommandMetadata {
            summary: Some("list available commands".into()),
            usage: Some("help".into()),
            options: Vec::new(),
        },
    )
}

pub fn ls() -> CommandDescriptor {
    CommandDescriptor::from_parts(
        "ls",
        Arc::new(LsHandler),
        CommandMetadata {
            summary: Some("list directory entries".into()),
            usage: Some("ls [path]".into()),
            options: Vec::new(),
        },
    )
}

pub fn sleep() -> CommandDescriptor {
    CommandDescriptor::from_parts(
        "sleep",
        Arc::new(SleepHandler),
        CommandMetadata {
            summary: Some("wait for a number of seconds".into()),
            usage: Some("sleep seconds".into()),
            options: Vec::new(),
        },
    )
}

/// Writes its arguments separated by spaces.
pub struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn process(&self, process: &CommandProcess<'_>) -> ProcessResult {
        process.write(format!("{}\n", process.args.join(" "))).await?;
        Ok(0)
    }
}

/// Lists the commands of the resolver it runs under.
pub struct HelpHandler;

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn process(&self, process: &CommandProcess<'_>) -> ProcessResult {
        let mut out = String::from("available commands:\n");
        for command in process.resolver.commands() {
            match &command.metadata().summary {
                Some(summary) => out.push_str(&format!("{} - {}\n", command.name(), summary)),
                None => out.push_str(&format!("{}\n", command.name())),
            }
        }
        process.write(out).await?;
        Ok(0)
    }
}

/// Lists the entries of a directory, one name per line, sorted.
pub struct LsHandler;

#[async_trait]
impl CommandHandler for LsHandler {
    async fn process(&self, process: &CommandProcess<'_>) -> ProcessResult {
        let path = process.args.first().map_or(".", String::as_str);
        if tokio::fs::metadata(path).await.is_err() {
            process
                .write(format!("ls: {path}: No such file or directory\n"))
                .await?;
            return Ok(1);
        }

        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut out = String::new();
        for name in names {
            out.push_str(&name);
            out.push('\n');
        }
        process.write(out).await?;
        Ok(0)
    }
}

/// Waits for the given number of seconds or until interrupted.
pub struct SleepHandler;

#[async_trait]
impl CommandHandler for SleepHandler {
    async fn process(&self, process: &CommandProcess<'_>) -> ProcessResult {
        let Some(arg) = process.args.first() else {
            process.write("usage: sleep seconds\n").await?;
            return Ok(0);
        };
        // Unparseable or non-positive durations end right away.
        let seconds = arg.parse::<u64>().unwrap_or(0);
        if seconds == 0 {
            return Ok(0);
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            _ = process.interrupt.cancelled() => {
                tracing::debug!(seconds, "Sleep interrupted");
            }
        }
        Ok(0)
    }
}
