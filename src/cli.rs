use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config;
use crate::document::markdown::{load_document, point_for_line};
use crate::document::Point;
use crate::engine::ConsoleEngine;
use crate::hotkey::{handle_hotkey, HotkeyAction, Keymap};
use crate::narration::{TriggerMessage, TriggerMode};
use crate::session::{SessionDriver, StatusLine, UiEvent};
use crate::state::PlaybackState;

/// Read a document aloud from wherever you point at.
#[derive(Debug, Parser)]
#[command(name = "read-from-here", version, about)]
pub struct Cli {
    /// Markdown (.md) or plain-text document
    pub file: PathBuf,

    /// Entry mode
    #[arg(long, value_enum, default_value_t = Mode::Page)]
    pub mode: Mode,

    /// Horizontal coordinate of the trigger point
    #[arg(long, default_value_t = 0.0)]
    pub x: f64,

    /// Vertical coordinate of the trigger point
    #[arg(long, default_value_t = 0.0)]
    pub y: f64,

    /// Trigger at this 1-based source line instead of --x/--y
    #[arg(long, conflicts_with_all = ["x", "y"])]
    pub line: Option<usize>,

    /// Select the first occurrence of this text before triggering
    #[arg(long)]
    pub select: Option<String>,

    /// Document language, also used as the fallback voice language
    #[arg(long)]
    pub lang: Option<String>,

    /// Speech rate (overrides settings)
    #[arg(long)]
    pub rate: Option<f32>,

    /// Settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print UI events as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Selection,
    FromHere,
    Page,
}

impl From<Mode> for TriggerMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Selection => Self::Selection,
            Mode::FromHere => Self::FromHere,
            Mode::Page => Self::Page,
        }
    }
}

impl Cli {
    pub fn trigger(&self) -> TriggerMessage {
        let point = match self.line {
            Some(line) => point_for_line(line),
            None => Point::new(self.x, self.y),
        };
        TriggerMessage::new(self.mode.into()).at(point)
    }
}

/// Narrates the file and forwards stdin lines as hotkeys. Exits when the
/// user quits or the session goes idle; a stop counts as going idle.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(rate) = cli.rate {
        settings.tts.rate = rate;
    }
    if cli.lang.is_some() {
        settings.tts.fallback_language = cli.lang.clone();
    }

    let mut document = load_document(&cli.file, cli.lang.clone())?;
    if let Some(needle) = &cli.select {
        if document.select_text(needle).is_none() {
            tracing::warn!("{:?} does not occur in {}", needle, cli.file.display());
        }
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine = ConsoleEngine::new(events_tx.clone(), settings.tts.words_per_minute);
    let (handle, mut ui_events, driver) =
        SessionDriver::spawn(document, engine, (events_tx, events_rx), &settings);

    let keymap = Keymap::from_settings(&settings.shortcuts);
    tracing::info!("Keys: {}", keymap.help_line());
    handle.trigger(cli.trigger())?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut started = false;

    loop {
        tokio::select! {
            event = ui_events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, cli.json)?;
                match event {
                    UiEvent::Playback(PlaybackState::Speaking) => started = true,
                    UiEvent::Playback(PlaybackState::Idle) if started => break,
                    UiEvent::Status(StatusLine::NothingSelected) => break,
                    _ => {}
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) => match keymap.action_for(&line) {
                        Some(HotkeyAction::Quit) => break,
                        Some(action) => handle_hotkey(&handle, action)?,
                        None if line.trim().is_empty() => {}
                        None => tracing::warn!("Unbound key {:?}. {}", line.trim(), keymap.help_line()),
                    },
                    None => stdin_open = false,
                }
            }
        }
    }

    // the driver may already be gone if the UI channel closed
    let _ = handle.shutdown();
    driver.await.context("Reading session task failed")?;
    Ok(())
}

fn print_event(event: &UiEvent, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        UiEvent::Status(status) if *status != StatusLine::Empty => eprintln!("[{}]", status),
        UiEvent::PauseLabel(label) => tracing::debug!("Button: {}", label),
        UiEvent::BlockFailed { message, .. } => eprintln!("[skipped] {}", message),
        UiEvent::Contrast(on) => eprintln!("[high contrast {}]", if *on { "on" } else { "off" }),
        _ => {}
    }
    Ok(())
}
