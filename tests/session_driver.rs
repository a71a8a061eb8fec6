mod common;

use std::time::Duration;

use common::{default_voices, paragraphs, Call, MockEngine};
use read_from_here_lib::commands::SessionClosed;
use read_from_here_lib::document::markdown::point_for_line;
use read_from_here_lib::engine::{ConsoleEngine, EngineEvent, Voice};
use read_from_here_lib::narration::{TriggerMessage, TriggerMode};
use read_from_here_lib::session::{SessionDriver, StatusLine, UiEvent};
use read_from_here_lib::state::{PlaybackState, Settings};
use tokio::sync::mpsc;

fn page_at(line: usize) -> TriggerMessage {
    TriggerMessage::new(TriggerMode::Page).at(point_for_line(line))
}

#[tokio::test(start_paused = true)]
async fn skipping_waits_out_the_quiescent_interval() {
    let engine = MockEngine::with_voices(default_voices());
    let (handle, _ui, _task) = SessionDriver::spawn(
        paragraphs(&["One.", "Two.", "Three."]),
        engine.clone(),
        mpsc::unbounded_channel(),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();
    handle.next_block().unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.cursor, 1);
    assert_eq!(engine.spoken(), vec!["One."]);
    assert_eq!(engine.calls().last(), Some(&Call::Cancel));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.spoken(), vec!["One."]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.spoken(), vec!["One.", "Two."]);
    assert_eq!(engine.overlaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_a_pending_utterance() {
    let engine = MockEngine::with_voices(default_voices());
    let (handle, _ui, _task) = SessionDriver::spawn(
        paragraphs(&["One.", "Two."]),
        engine.clone(),
        mpsc::unbounded_channel(),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();
    handle.next_block().unwrap();
    handle.toggle_pause().unwrap();
    assert_eq!(handle.status().await.unwrap().playback, PlaybackState::Paused);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.spoken(), vec!["One."]);

    handle.toggle_pause().unwrap();
    assert_eq!(handle.status().await.unwrap().playback, PlaybackState::Speaking);
    assert_eq!(engine.spoken(), vec!["One.", "Two."]);
}

#[tokio::test(start_paused = true)]
async fn voice_change_while_held_applies_on_resume() {
    let engine = MockEngine::with_voices(default_voices());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (handle, _ui, _task) = SessionDriver::spawn(
        paragraphs(&["One.", "Two."]),
        engine.clone(),
        (events_tx.clone(), events_rx),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();
    handle.next_block().unwrap();
    handle.toggle_pause().unwrap();
    assert_eq!(handle.status().await.unwrap().playback, PlaybackState::Paused);

    let mut voices = default_voices();
    voices.push(Voice::new("cloud:en", "Google US English", "en-US"));
    engine.set_voices(voices);
    events_tx.send(EngineEvent::VoicesChanged).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.spoken(), vec!["One."]);

    handle.toggle_pause().unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.playback, PlaybackState::Speaking);
    assert_eq!(status.voice_id.as_deref(), Some("cloud:en"));
    assert_eq!(engine.spoken(), vec!["One.", "Two."]);
    assert_eq!(engine.last_voice().as_deref(), Some("cloud:en"));
}

#[tokio::test(start_paused = true)]
async fn stop_drops_a_pending_utterance() {
    let engine = MockEngine::with_voices(default_voices());
    let (handle, _ui, _task) = SessionDriver::spawn(
        paragraphs(&["One.", "Two."]),
        engine.clone(),
        mpsc::unbounded_channel(),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();
    handle.next_block().unwrap();
    handle.stop().unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.playback, PlaybackState::Idle);
    assert_eq!(status.block_count, 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.spoken(), vec!["One."]);
}

#[tokio::test(start_paused = true)]
async fn trigger_reads_the_live_selection() {
    let mut doc = paragraphs(&["Hello world.", "After."]);
    doc.select_text("world").unwrap();
    let engine = MockEngine::with_voices(default_voices());
    let (handle, _ui, _task) = SessionDriver::spawn(
        doc,
        engine.clone(),
        mpsc::unbounded_channel(),
        &Settings::default(),
    );

    handle.trigger(TriggerMessage::new(TriggerMode::FromHere)).unwrap();
    handle.status().await.unwrap();
    assert_eq!(engine.spoken(), vec!["world"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_handle() {
    let engine = MockEngine::with_voices(default_voices());
    let (handle, _ui, task) = SessionDriver::spawn(
        paragraphs(&["One."]),
        engine.clone(),
        mpsc::unbounded_channel(),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();
    handle.shutdown().unwrap();
    task.await.unwrap();

    assert_eq!(engine.calls().last(), Some(&Call::Cancel));
    assert_eq!(handle.stop(), Err(SessionClosed));
    assert!(handle.status().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn console_engine_reads_the_page_to_the_end() {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine = ConsoleEngine::new(events_tx.clone(), 600.0).silent();
    let (handle, mut ui, _task) = SessionDriver::spawn(
        paragraphs(&["First block here.", "Second block."]),
        engine,
        (events_tx, events_rx),
        &Settings::default(),
    );

    handle.trigger(page_at(1)).unwrap();

    let mut statuses = Vec::new();
    let mut spans = 0;
    let mut started = false;
    while let Some(event) = ui.recv().await {
        match event {
            UiEvent::Status(status) => statuses.push(status),
            UiEvent::Highlight(Some(target)) if target.span.is_some() => spans += 1,
            UiEvent::Playback(PlaybackState::Speaking) => started = true,
            UiEvent::Playback(PlaybackState::Idle) if started => break,
            _ => {}
        }
    }

    assert_eq!(
        statuses,
        vec![
            StatusLine::Block { index: 0, total: 2 },
            StatusLine::Block { index: 1, total: 2 },
            StatusLine::Empty
        ]
    );
    assert_eq!(spans, 5);
}
