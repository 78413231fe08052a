use std::time::Duration;

use crossterm::event::KeyEvent;

use crate::engine::{RandomTargets, SessionEngine, TargetSource, TickReport};
use crate::input::{command_for_key, Command, KeyHold};
use crate::runtime::InputEvent;
use crate::signal::{SignalKind, SignalSource};

/// How long the "+points" popup stays up after a hit, in seconds.
pub const HIT_FLASH_SECS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitFlash {
    pub points: u64,
    pub remaining: f64,
}

/// Everything one running game needs: engine, control input and UI feedback.
pub struct App<T: TargetSource = RandomTargets> {
    engine: SessionEngine<T>,
    signal: Box<dyn SignalSource>,
    keys: KeyHold,
    flash: Option<HitFlash>,
    should_quit: bool,
}

impl<T: TargetSource> App<T> {
    /// `keys` must be the tracker a manual signal reads from, if one is used.
    pub fn new(engine: SessionEngine<T>, signal: Box<dyn SignalSource>, keys: KeyHold) -> Self {
        Self {
            engine,
            signal,
            keys,
            flash: None,
            should_quit: false,
        }
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Key(key) => self.on_key(key),
            InputEvent::Resize => {}
        }
    }

    pub fn on_key(&mut self, key: &KeyEvent) {
        match command_for_key(self.engine.state(), key) {
            Some(Command::Action(action)) => match self.engine.apply(action) {
                Ok(_) => self.flash = None,
                Err(e) => log::debug!("ignored key: {}", e),
            },
            Some(Command::Hold(direction)) => self.keys.press(direction),
            Some(Command::Release(direction)) => self.keys.release(direction),
            Some(Command::Quit) => self.should_quit = true,
            None => {}
        }
    }

    /// Refreshes the signal and advances the engine by one frame.
    pub fn on_frame(&mut self, dt: Duration) -> TickReport {
        self.signal.refresh();
        let secs = dt.as_secs_f64();
        let report = self.engine.update(secs, self.signal.current_value());

        if let Some(flash) = self.flash.as_mut() {
            flash.remaining -= secs;
            if flash.remaining <= 0.0 {
                self.flash = None;
            }
        }
        if let Some(points) = report.hit {
            self.flash = Some(HitFlash {
                points,
                remaining: HIT_FLASH_SECS,
            });
        }

        report
    }

    pub fn engine(&self) -> &SessionEngine<T> {
        &self.engine
    }

    pub fn signal_kind(&self) -> SignalKind {
        self.signal.kind()
    }

    pub fn flash(&self) -> Option<&HitFlash> {
        self.flash.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::session::SessionState;
    use crate::signal::ManualSignal;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(&KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn keyboard_app(config: GameConfig) -> App {
        let keys = KeyHold::new();
        let signal = ManualSignal::new(0.01, keys.clone());
        App::new(SessionEngine::new(config), Box::new(signal), keys)
    }

    #[test]
    fn keys_drive_state_machine() {
        let mut app = keyboard_app(GameConfig {
            session_secs: 0.5,
            seed: Some(1),
            ..GameConfig::default()
        });
        assert_eq!(app.signal_kind(), SignalKind::Manual);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.engine().state(), SessionState::Menu);

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.engine().state(), SessionState::Playing);

        app.on_frame(Duration::from_millis(500));
        assert_eq!(app.engine().state(), SessionState::GameOver);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.engine().state(), SessionState::Menu);
        assert!(!app.should_quit());

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());
    }

    #[test]
    fn arrow_keys_move_manual_signal() {
        let mut app = keyboard_app(GameConfig::default());
        press(&mut app, KeyCode::Up);
        for _ in 0..5 {
            app.on_frame(Duration::from_millis(16));
        }
        assert!((app.engine().signal_value() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn hit_raises_flash_that_fades() {
        let mut app = keyboard_app(GameConfig {
            tolerance: 0.45,
            seed: Some(3),
            ..GameConfig::default()
        });
        press(&mut app, KeyCode::Char(' '));

        let report = app.on_frame(Duration::from_millis(100));
        assert_eq!(report.hit, Some(110));
        assert_eq!(app.flash().map(|f| f.points), Some(110));

        app.on_frame(Duration::from_millis(700));
        assert!(app.flash().is_none());
    }
}
