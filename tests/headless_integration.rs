use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use distance_combo::app::App;
use distance_combo::config::GameConfig;
use distance_combo::engine::SessionEngine;
use distance_combo::input::KeyHold;
use distance_combo::runtime::{FixedTicker, InputEvent, Runner, TestEventSource};
use distance_combo::session::SessionState;
use distance_combo::signal::{ChannelEvent, ManualSignal, StreamingSignal};

fn key(code: KeyCode) -> InputEvent {
    InputEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn keyboard_app(config: GameConfig) -> App {
    let keys = KeyHold::new();
    let signal = ManualSignal::new(0.01, keys.clone());
    App::new(SessionEngine::new(config), Box::new(signal), keys)
}

// Headless integration using the internal runtime without a TTY
// Drives a short session from the menu to game over and back.
#[test]
fn headless_session_runs_to_game_over() {
    let mut app = keyboard_app(GameConfig {
        session_secs: 0.2,
        seed: Some(11),
        ..GameConfig::default()
    });

    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(5));
    let mut runner = Runner::new(es, ticker);

    tx.send(key(KeyCode::Char(' '))).unwrap();

    for _ in 0..200u32 {
        let frame = runner.next_frame();
        for event in &frame.events {
            app.handle_event(event);
        }
        app.on_frame(frame.dt);
        if app.engine().state() == SessionState::GameOver {
            break;
        }
    }

    assert_eq!(app.engine().state(), SessionState::GameOver);
    assert!(app.engine().session_elapsed() >= 0.2);
    assert_eq!(app.engine().time_left(), 0.0);

    tx.send(key(KeyCode::Esc)).unwrap();
    let frame = runner.next_frame();
    for event in &frame.events {
        app.handle_event(event);
    }
    assert_eq!(app.engine().state(), SessionState::Menu);
    assert!(!app.should_quit());

    tx.send(key(KeyCode::Char('q'))).unwrap();
    let frame = runner.next_frame();
    for event in &frame.events {
        app.handle_event(event);
    }
    assert!(app.should_quit());
}

#[test]
fn headless_streaming_session_scores_from_sensor() {
    let (line_tx, line_rx) = mpsc::channel();
    let signal = StreamingSignal::from_channel(line_rx);
    let config = GameConfig {
        tolerance: 0.45,
        seed: Some(5),
        ..GameConfig::default()
    };
    let mut app = App::new(
        SessionEngine::new(config),
        Box::new(signal),
        KeyHold::new(),
    );

    app.handle_event(&key(KeyCode::Char(' ')));
    assert_eq!(app.engine().state(), SessionState::Playing);

    line_tx
        .send(ChannelEvent::Line("0.500\n".to_string()))
        .unwrap();
    let report = app.on_frame(Duration::from_millis(16));

    assert_eq!(app.engine().signal_value(), 0.5);
    assert_eq!(report.hit, Some(110));
    assert_eq!(app.engine().hits(), 1);

    // A dead link keeps the last value and the session goes on
    drop(line_tx);
    app.on_frame(Duration::from_millis(16));
    assert_eq!(app.engine().signal_value(), 0.5);
    assert_eq!(app.engine().state(), SessionState::Playing);
}
