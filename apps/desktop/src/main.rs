use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, Stage, VideoCandidate, WorkflowController, WorkflowState};
use shared::domain::{Action, HistoryEntry};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Upload videos for action recognition and browse past predictions")]
struct Args {
    /// Overrides the configured backend base URL.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video and print the recognized actions.
    Run { path: PathBuf },
    /// Upload a video and print its remote URL.
    Upload { path: PathBuf },
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    List,
    Show {
        id: String,
    },
    /// Delete every stored prediction.
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "using backend");
    let controller = Arc::new(WorkflowController::from_settings(&settings)?);

    match args.command {
        Command::Run { path } => {
            select(&controller, &path).await?;
            let progress = spawn_progress_printer(&controller);
            let result = controller.upload_and_predict().await;
            progress.abort();
            eprintln!();
            result?;
            print_results(&controller.snapshot());
        }
        Command::Upload { path } => {
            select(&controller, &path).await?;
            let progress = spawn_progress_printer(&controller);
            let result = controller.start_upload().await;
            progress.abort();
            eprintln!();
            result?;
            if let Some(outcome) = controller.snapshot().upload_outcome {
                println!("{}", outcome.video_url);
            }
        }
        Command::History(HistoryCommand::List) => {
            controller.toggle_history().await?;
            let state = controller.snapshot();
            if state.history.is_empty() {
                println!("No history yet.");
            }
            for entry in state.history.entries() {
                print_entry(entry);
            }
        }
        Command::History(HistoryCommand::Show { id }) => {
            controller.toggle_history().await?;
            let entry = controller.select_history_by_id(&id).await?;
            print_entry(&entry);
            print_results(&controller.snapshot());
        }
        Command::History(HistoryCommand::Clear { yes }) => {
            if !yes && !confirm("Delete all prediction history? [y/N] ").await? {
                println!("Aborted.");
                return Ok(());
            }
            controller.delete_history().await?;
            println!("History deleted.");
        }
    }

    Ok(())
}

async fn select(controller: &WorkflowController, path: &Path) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("video.bin")
        .to_string();
    let media_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream");
    controller
        .select_file(VideoCandidate::new(file_name, media_type, data))
        .await?;
    Ok(())
}

fn spawn_progress_printer(controller: &WorkflowController) -> JoinHandle<()> {
    let mut updates = WatchStream::new(controller.subscribe());
    tokio::spawn(async move {
        let mut last = None;
        while let Some(state) = updates.next().await {
            let line = match state.stage {
                Stage::Uploading | Stage::Uploaded => {
                    format!("uploading {:>3}%", state.upload_progress)
                }
                Stage::Predicting => "predicting...".to_string(),
                _ => continue,
            };
            if last.as_ref() != Some(&line) {
                eprint!("\r{line}");
                last = Some(line);
            }
        }
    })
}

fn print_results(state: &WorkflowState) {
    match &state.prediction {
        Some(actions) if actions.is_empty() => println!("No actions recognized."),
        Some(actions) => {
            for action in actions {
                println!("  {}", describe_action(action));
            }
        }
        None => println!("No prediction available."),
    }
}

fn print_entry(entry: &HistoryEntry) {
    let created = entry
        .created_at_utc()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| entry.created_at.clone());
    let actions = entry
        .predicted_actions
        .iter()
        .map(describe_action)
        .collect::<Vec<_>>()
        .join(", ");
    println!("#{} {created} {} [{actions}]", entry.id, entry.video_url);
}

fn describe_action(action: &Action) -> String {
    match &action.confidence {
        Some(confidence) => format!("{} ({confidence})", action.label),
        None => action.label.clone(),
    }
}

async fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::Confidence;

    #[test]
    fn parses_history_clear_flags() {
        let args = Args::parse_from(["desktop", "history", "clear", "--yes"]);
        assert!(matches!(
            args.command,
            Command::History(HistoryCommand::Clear { yes: true })
        ));
    }

    #[test]
    fn server_url_is_accepted_after_subcommand() {
        let args = Args::parse_from(["desktop", "run", "clip.mp4", "--server-url", "http://x:1"]);
        assert_eq!(args.server_url.as_deref(), Some("http://x:1"));
        assert!(matches!(args.command, Command::Run { .. }));
    }

    #[test]
    fn describes_actions_with_and_without_confidence() {
        assert_eq!(describe_action(&Action::new("walking")), "walking");
        assert_eq!(
            describe_action(&Action::with_confidence(
                "running",
                Confidence::Text("0.92".into())
            )),
            "running (0.92)"
        );
    }
}
