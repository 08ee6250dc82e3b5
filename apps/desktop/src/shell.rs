//! Line-oriented front end over a single workflow controller.

use std::{fmt::Write as _, path::PathBuf};

use client_core::{
    selection::guess_mime_type, ImageFile, WorkflowController, WorkflowEvent, WorkflowState,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::{self, error::TryRecvError},
};

use crate::render;

pub const HELP: &str = "\
commands:
  select <path>      pick an image file
  drop <path>...     drop files onto the upload area (first one is used)
  predict            analyze the selected image
  clear              start over with another image
  status             show the current selection and result
  history            list predictions made in this session
  help               show this text
  quit               leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Select(PathBuf),
    Drop(Vec<PathBuf>),
    Predict,
    Clear,
    Status,
    History,
    Help,
    Quit,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let no_args = |command: ShellCommand| {
        if rest.is_empty() {
            Ok(command)
        } else {
            Err(format!("'{verb}' takes no arguments"))
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Ok(ShellCommand::Nothing),
        "select" | "open" => {
            if rest.is_empty() {
                Err("usage: select <path>".into())
            } else {
                Ok(ShellCommand::Select(PathBuf::from(rest)))
            }
        }
        "drop" => Ok(ShellCommand::Drop(
            rest.split_whitespace().map(PathBuf::from).collect(),
        )),
        "predict" | "analyze" => no_args(ShellCommand::Predict),
        "clear" => no_args(ShellCommand::Clear),
        "status" => no_args(ShellCommand::Status),
        "history" => no_args(ShellCommand::History),
        "help" | "?" => no_args(ShellCommand::Help),
        "quit" | "exit" => no_args(ShellCommand::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

pub fn status(controller: &WorkflowController) -> String {
    let mut out = format!("state: {:?}", controller.state());
    if controller.is_loading() {
        out.push_str(" (analyzing...)");
    }
    match controller.selected() {
        Some(selected) => {
            let file = selected.file();
            let _ = write!(
                out,
                "\nfile: {} ({}, {} bytes, preview {} chars)",
                file.name(),
                file.mime_type(),
                file.size(),
                selected.preview().as_data_uri().len()
            );
        }
        None => out.push_str("\nfile: none"),
    }
    if let (Some(selected), Some(result)) = (controller.selected(), controller.result()) {
        let _ = write!(
            out,
            "\n{}",
            render::result_card(selected.file().name(), result)
        );
    }
    let _ = write!(out, "\nhistory: {} entries", controller.history().len());
    out
}

async fn read_dropped(path: PathBuf) -> Result<ImageFile, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImageFile::new(name, guess_mime_type(&path), bytes))
}

/// Runs one command against the controller, appending anything to show to `out`.
pub async fn execute(
    controller: &mut WorkflowController,
    command: ShellCommand,
    out: &mut String,
) -> Flow {
    match command {
        ShellCommand::Nothing => {}
        ShellCommand::Help => out.push_str(HELP),
        ShellCommand::Quit => return Flow::Quit,
        ShellCommand::Select(path) => {
            if controller.select_path(&path).await.is_ok() {
                let _ = write!(out, "selected {}", path.display());
            }
        }
        ShellCommand::Drop(paths) => {
            controller.drag_over();
            let Some(first) = paths.into_iter().next() else {
                let _ = controller.drop_files(Vec::new());
                return Flow::Continue;
            };
            match read_dropped(first).await {
                Ok(file) => {
                    let name = file.name().to_string();
                    if controller.drop_files([file]).is_ok() {
                        let _ = write!(out, "selected {name}");
                    }
                }
                Err(message) => {
                    controller.drag_leave();
                    out.push_str(&message);
                }
            }
        }
        ShellCommand::Predict => match controller.predict().await {
            Ok(result) => {
                let name = controller
                    .selected()
                    .map(|selected| selected.file().name().to_string())
                    .unwrap_or_default();
                out.push_str(&render::result_card(&name, &result));
            }
            Err(err) => {
                if let Some(hint) = render::failure_hint(&err) {
                    out.push_str(&hint);
                }
            }
        },
        ShellCommand::Clear => {
            controller.clear();
            out.push_str("cleared; select another image");
        }
        ShellCommand::Status => out.push_str(&status(controller)),
        ShellCommand::History => out.push_str(&render::session_history(controller.history())),
    }
    Flow::Continue
}

fn drain_notices(events: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        match events.try_recv() {
            Ok(WorkflowEvent::Notice(notice)) => lines.push(render::notice(&notice)),
            Ok(WorkflowEvent::StateChanged(WorkflowState::Submitting)) => {
                lines.push("Analyzing...".to_string())
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    lines
}

pub async fn run(mut controller: WorkflowController) -> anyhow::Result<()> {
    let mut events = controller.subscribe_events();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Bedbug detector shell. Type 'help' for commands.\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let mut out = String::new();
        let flow = match parse_command(&line) {
            Ok(command) => execute(&mut controller, command, &mut out).await,
            Err(message) => {
                out.push_str(&message);
                Flow::Continue
            }
        };

        let mut text = drain_notices(&mut events).join("\n");
        if !out.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&out);
        }
        if !text.is_empty() {
            text.push('\n');
        }
        if flow == Flow::Quit {
            stdout.write_all(text.as_bytes()).await?;
            break;
        }
        text.push_str("> ");
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }

    controller.settle_persistence().await;
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
