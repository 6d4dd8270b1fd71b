//! Kiosk binary
//!
//! Runs the engine with a line-oriented operator console on standard input.
//! Announcements are printed to standard output as JSON lines; logs go to
//! standard error and are filtered with `RUST_LOG`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scanquiz::{
    Command,
    config::Config,
    hardware::FeedbackPresenter,
    presenter::ConsolePresenter,
    runtime::{self, ChannelCapture, Decoding, Kiosk, LineSource, TextDecoder},
    store::FileStore,
};

/// token-triggered trivia kiosk
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
struct Cli {
    /// configuration file (JSON); defaults are used when omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// directory the hall of fame is stored in
    #[clap(short = 'd', long, default_value = "scanquiz-data")]
    data_dir: PathBuf,

    /// answer box device, opened for every session
    #[clap(long)]
    device: Option<PathBuf>,

    /// send LED and buzzer feedback to the answer box
    #[clap(long, requires = "device")]
    feedback: bool,
}

const HELP: &str = "commands: start | scan <text> | random | tap <answer> | key <key> | \
hw <line> | pause | resume | stop | reset | save <name> | board | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let (feedback, feedback_lines) = FeedbackPresenter::new();
    if let (true, Some(device)) = (cli.feedback, &cli.device) {
        let writer = tokio::fs::OpenOptions::new()
            .write(true)
            .open(device)
            .await
            .with_context(|| format!("opening {} for feedback", device.display()))?;
        tokio::spawn(runtime::write_feedback(feedback_lines, writer));
    }

    let store = FileStore::new(&cli.data_dir);
    info!(data_dir = %store.directory().display(), "hall of fame location");
    let vocabulary = config.vocabulary.clone();
    let (mut kiosk, dispatcher) = Kiosk::launch(config, store, (ConsolePresenter, feedback));

    info!("kiosk ready");
    eprintln!("{HELP}");

    let mut frames = None;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = input.next_line().await? {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match verb {
            "" => {}
            "start" => {
                let (sender, capture) = ChannelCapture::new();
                let hardware = match &cli.device {
                    Some(path) => match tokio::fs::File::open(path).await {
                        Ok(file) => Some(Box::new(BufReader::new(file)) as LineSource),
                        Err(e) => {
                            warn!(error = %e, device = %path.display(), "answer box unavailable");
                            None
                        }
                    },
                    None => None,
                };
                let scanner = Box::new(Decoding::new(capture, TextDecoder));
                match kiosk.start_session(Some(scanner), hardware).await {
                    Ok(router) => {
                        info!(session = %router.session(), "session started");
                        frames = Some(sender);
                    }
                    Err(e) => warn!(error = %e, "could not start a session"),
                }
            }
            "scan" | "random" => {
                let text = if verb == "random" {
                    vocabulary.random_token().map(|t| t.to_string())
                } else {
                    Some(rest.to_owned())
                };
                match (&frames, text) {
                    (Some(frames), Some(text)) => {
                        let _ = frames.send(text);
                    }
                    _ => warn!("no camera is running"),
                }
            }
            "tap" | "key" | "hw" => {
                let Some(router) = kiosk.router() else {
                    warn!("no session is running");
                    continue;
                };
                let routed = match verb {
                    "tap" => router.onscreen(rest),
                    "key" => router.key(rest),
                    _ => router.hardware_line(rest),
                };
                if let Err(e) = routed {
                    info!(reason = %e, "input dropped");
                }
            }
            "pause" => kiosk.send(Command::Pause)?,
            "resume" => kiosk.send(Command::Resume)?,
            "stop" => {
                kiosk.stop_session()?;
                frames = None;
            }
            "reset" => {
                kiosk.stop_session()?;
                frames = None;
                kiosk.send(Command::Reset)?;
            }
            "save" => kiosk.send(Command::Save {
                name: rest.to_owned(),
            })?,
            "board" => kiosk.send(Command::Sync)?,
            "quit" | "exit" => break,
            _ => eprintln!("{HELP}"),
        }

        if kiosk.release_finished() {
            frames = None;
        }
    }

    kiosk.shutdown()?;
    dispatcher.await.context("dispatcher task failed")?;

    Ok(())
}
