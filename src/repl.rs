//! REPL input handling - keyboard lines in, resolved intents and events out

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::command::{CommandResolver, CommandResult, process_slash_command};
use crate::events::ConsoleEvent;

/// What one input line produced
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Output(String),
    Empty,
    Quit,
}

/// Handle one console line: slash command or utterance
pub fn handle_line(resolver: &mut CommandResolver, line: &str) -> Result<LineOutcome> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineOutcome::Empty);
    }

    if line.starts_with('/') {
        return match process_slash_command(line, resolver) {
            Some(CommandResult::Handled(text)) => Ok(LineOutcome::Output(text)),
            Some(CommandResult::Resolved(resolved)) => {
                Ok(LineOutcome::Output(serde_json::to_string(&resolved)?))
            }
            Some(CommandResult::Shutdown) => Ok(LineOutcome::Quit),
            None => Ok(LineOutcome::Output(format!(
                "Unknown command: {} (try /help)",
                line
            ))),
        };
    }

    let resolved = resolver.resolve(line);
    Ok(LineOutcome::Output(serde_json::to_string(&resolved)?))
}

/// Drain pending console events into printable lines
pub fn drain_events(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Ok(event) = events.try_recv() {
        lines.push(format!("  -> {}", serde_json::to_string(&event)?));
    }
    Ok(lines)
}

/// Interactive console on stdin/stdout until EOF or /quit
pub async fn run(
    mut resolver: CommandResolver,
    mut events: mpsc::UnboundedReceiver<ConsoleEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout
        .write_all(b"nura console - type an utterance or /help\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match handle_line(&mut resolver, &line)? {
            LineOutcome::Quit => break,
            LineOutcome::Empty => {}
            LineOutcome::Output(text) => {
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
        }
        for event in drain_events(&mut events)? {
            stdout.write_all(event.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    tracing::debug!("console closed");
    Ok(())
}
