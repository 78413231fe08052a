use std::collections::VecDeque;

use distance_combo::config::GameConfig;
use distance_combo::engine::{SessionEngine, TargetSource};
use distance_combo::input::{Direction, KeyHold};
use distance_combo::session::SessionState;
use distance_combo::signal::{ChannelEvent, ManualSignal, SignalSource, StreamingSignal};

/// Plays back fixed target positions, repeating the last one.
struct ScriptedTargets {
    queue: VecDeque<f64>,
    last: f64,
}

impl ScriptedTargets {
    fn new(values: &[f64]) -> Self {
        Self {
            queue: values.iter().copied().collect(),
            last: 0.5,
        }
    }
}

impl TargetSource for ScriptedTargets {
    fn next_target(&mut self, _min: f64, _max: f64) -> f64 {
        if let Some(v) = self.queue.pop_front() {
            self.last = v;
        }
        self.last
    }
}

fn engine(config: GameConfig, targets: &[f64]) -> SessionEngine<ScriptedTargets> {
    SessionEngine::with_targets(config, ScriptedTargets::new(targets))
}

#[test]
fn scenario_a_holding_target_for_a_round_hits_once() {
    let mut e = engine(GameConfig::default(), &[0.42, 0.8]);
    assert!(e.on_start());

    // 2.0s in steps of 1/64s; the last step rotates to the next target
    for _ in 0..127 {
        e.update(1.0 / 64.0, 0.42);
    }
    assert_eq!(e.hits(), 1);
    assert_eq!(e.score(), 110);
    assert_eq!(e.current_streak(), 1);
    assert_eq!(e.total_targets_presented(), 0);

    let report = e.update(1.0 / 64.0, 0.42);
    assert_eq!(report.rotated, Some(false));
    assert_eq!(e.target(), 0.8);
    assert_eq!(e.hits(), 1);
    assert_eq!(e.score(), 110);
    assert_eq!(e.current_streak(), 1);
}

#[test]
fn scenario_b_three_missed_rotations() {
    let mut e = engine(GameConfig::default(), &[0.3, 0.5, 0.7, 0.4]);
    e.on_start();

    for _ in 0..3 {
        let report = e.update(2.0, 0.0);
        assert_eq!(report.rotated, Some(true));
        assert_eq!(e.current_streak(), 0);
    }
    assert_eq!(e.hits(), 0);
    assert_eq!(e.total_targets_presented(), 3);
    assert_eq!(e.score(), 0);
}

#[test]
fn scenario_b_miss_breaks_a_running_streak() {
    let mut e = engine(GameConfig::default(), &[0.3, 0.5, 0.7]);
    e.on_start();

    e.update(0.5, 0.3);
    e.update(1.5, 0.0);
    e.update(0.5, 0.5);
    assert_eq!(e.current_streak(), 2);

    e.update(1.5, 0.0);
    e.update(2.0, 0.0);
    assert_eq!(e.current_streak(), 0);
    assert_eq!(e.best_streak(), 2);
    assert_eq!(e.total_targets_presented(), 3);
}

#[test]
fn scenario_c_manual_source_steps_and_clamps() {
    let keys = KeyHold::new();
    let mut signal = ManualSignal::new(0.01, keys.clone());
    keys.press(Direction::Increase);

    for _ in 0..10 {
        signal.refresh();
    }
    assert!((signal.current_value() - 0.6).abs() < 1e-9);

    for _ in 0..50 {
        signal.refresh();
    }
    assert_eq!(signal.current_value(), 1.0);
}

#[test]
fn scenario_d_last_valid_streamed_line_wins() {
    let (tx, rx) = std::sync::mpsc::channel();
    for line in ["0.2\n", "bad\n", "0.7\n"] {
        tx.send(ChannelEvent::Line(line.to_string())).unwrap();
    }
    let mut signal = StreamingSignal::from_channel(rx);
    signal.refresh();
    assert_eq!(signal.current_value(), 0.7);

    tx.send(ChannelEvent::Line("oops\n".to_string())).unwrap();
    signal.refresh();
    assert_eq!(signal.current_value(), 0.7);
}

#[test]
fn scenario_e_game_over_freezes_stats() {
    let config = GameConfig {
        session_secs: 3.0,
        ..GameConfig::default()
    };
    let mut e = engine(config, &[0.3, 0.6]);
    e.on_start();

    e.update(2.0, 0.0);
    e.update(0.5, 0.6);
    assert!(e.target_hit());
    let report = e.update(0.5, 0.6);
    assert!(report.session_ended);
    assert_eq!(e.state(), SessionState::GameOver);

    let frozen = *e.stats();
    let elapsed = e.session_elapsed();
    for _ in 0..100 {
        e.update(0.5, 0.3);
    }
    assert_eq!(e.stats(), &frozen);
    assert_eq!(e.session_elapsed(), elapsed);
    assert!(e.target_hit());

    assert!(e.on_restart());
    assert_eq!(e.score(), 0);
    assert_eq!(e.hits(), 0);
    assert!(!e.target_hit());
}
