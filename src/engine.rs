use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::config::GameConfig;
use crate::session::{SessionState, SessionStats, Target, Timers};

/// Explicit user actions that move the session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    Start,
    Restart,
    ReturnToMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} while in {state}")]
pub struct TransitionError {
    pub action: Action,
    pub state: SessionState,
}

/// Produces the next target position strictly inside `(min, max)`.
pub trait TargetSource {
    fn next_target(&mut self, min: f64, max: f64) -> f64;
}

/// Uniform targets from a PCG generator.
#[derive(Debug, Clone)]
pub struct RandomTargets {
    rng: Pcg64,
}

impl RandomTargets {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg64::from_entropy(),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl TargetSource for RandomTargets {
    fn next_target(&mut self, min: f64, max: f64) -> f64 {
        // gen_range is half-open; redraw the rare exact lower bound
        loop {
            let value = self.rng.gen_range(min..max);
            if value > min && value < max {
                return value;
            }
        }
    }
}

/// What a single `update` did, for feedback and logging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Points scored by a hit registered this tick.
    pub hit: Option<u64>,
    /// Set when the target rotated; `true` if the closed round was missed.
    pub rotated: Option<bool>,
    pub session_ended: bool,
}

#[derive(Debug)]
pub struct SessionEngine<T: TargetSource = RandomTargets> {
    config: GameConfig,
    state: SessionState,
    target: Target,
    stats: SessionStats,
    timers: Timers,
    signal_value: f64,
    targets: T,
}

impl SessionEngine<RandomTargets> {
    pub fn new(config: GameConfig) -> Self {
        let targets = RandomTargets::from_seed(config.seed);
        Self::with_targets(config, targets)
    }
}

impl<T: TargetSource> SessionEngine<T> {
    pub fn with_targets(config: GameConfig, targets: T) -> Self {
        Self {
            config,
            state: SessionState::Menu,
            target: Target::default(),
            stats: SessionStats::default(),
            timers: Timers::default(),
            signal_value: 0.5,
            targets,
        }
    }

    /// Applies a user action. Illegal actions leave the engine untouched.
    pub fn apply(&mut self, action: Action) -> Result<SessionState, TransitionError> {
        let next = match (self.state, action) {
            (SessionState::Menu, Action::Start) | (SessionState::GameOver, Action::Restart) => {
                self.reset_session();
                SessionState::Playing
            }
            (SessionState::GameOver, Action::ReturnToMenu) => SessionState::Menu,
            (state, _) => return Err(TransitionError { action, state }),
        };
        log::debug!("{} -> {} on {}", self.state, next, action);
        self.state = next;
        Ok(next)
    }

    pub fn on_start(&mut self) -> bool {
        self.apply(Action::Start).is_ok()
    }

    pub fn on_restart(&mut self) -> bool {
        self.apply(Action::Restart).is_ok()
    }

    pub fn on_return_to_menu(&mut self) -> bool {
        self.apply(Action::ReturnToMenu).is_ok()
    }

    /// Advances the session by `dt` seconds with the latest signal value.
    pub fn update(&mut self, dt: f64, value: f64) -> TickReport {
        self.signal_value = value;

        match self.state {
            SessionState::Menu | SessionState::GameOver => TickReport::default(),
            SessionState::Playing => self.tick_playing(dt, value),
        }
    }

    fn tick_playing(&mut self, dt: f64, value: f64) -> TickReport {
        let mut report = TickReport::default();
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        self.timers.advance(dt);

        if self.timers.target_elapsed >= self.config.target_secs {
            let missed = !self.target.hit_this_round;
            self.rotate_target();
            report.rotated = Some(missed);
        }

        // Runs after rotation: a value in tolerance on the rotation tick
        // counts against the new target.
        if !self.target.hit_this_round && self.target.contains(value, self.config.tolerance) {
            self.target.hit_this_round = true;
            let points = self.stats.register_hit(&self.config);
            log::debug!(
                "hit at {:.3} (target {:.3}) for {} points, streak {}",
                value,
                self.target.value,
                points,
                self.stats.current_streak
            );
            report.hit = Some(points);
        }

        if self.timers.session_elapsed >= self.config.session_secs {
            self.state = SessionState::GameOver;
            report.session_ended = true;
            log::info!(
                "session over: score {} hits {}/{} best streak {}",
                self.stats.score,
                self.stats.hits,
                self.stats.total_targets_presented,
                self.stats.best_streak
            );
        }

        report
    }

    fn rotate_target(&mut self) {
        let was_hit = self.target.hit_this_round;
        self.stats.close_round(was_hit);
        self.timers.target_elapsed = 0.0;
        self.target = Target::new(self.draw_target());
        log::debug!(
            "target rotated to {:.3} (previous {})",
            self.target.value,
            if was_hit { "hit" } else { "missed" }
        );
    }

    fn reset_session(&mut self) {
        self.stats = SessionStats::default();
        self.timers = Timers::default();
        self.target = Target::new(self.draw_target());
        log::info!(
            "session started: {:.1}s, target every {:.1}s, tolerance {:.3}",
            self.config.session_secs,
            self.config.target_secs,
            self.config.tolerance
        );
    }

    fn draw_target(&mut self) -> f64 {
        let value = self
            .targets
            .next_target(self.config.target_min, self.config.target_max);
        debug_assert!(value > self.config.target_min && value < self.config.target_max);
        value
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_elapsed(&self) -> f64 {
        self.timers.session_elapsed
    }

    pub fn target_elapsed(&self) -> f64 {
        self.timers.target_elapsed
    }

    pub fn time_left(&self) -> f64 {
        (self.config.session_secs - self.timers.session_elapsed).max(0.0)
    }

    pub fn target(&self) -> f64 {
        self.target.value
    }

    pub fn target_hit(&self) -> bool {
        self.target.hit_this_round
    }

    pub fn signal_value(&self) -> f64 {
        self.signal_value
    }

    pub fn in_tolerance(&self) -> bool {
        self.target.contains(self.signal_value, self.config.tolerance)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn score(&self) -> u64 {
        self.stats.score
    }

    pub fn hits(&self) -> u32 {
        self.stats.hits
    }

    pub fn total_targets_presented(&self) -> u32 {
        self.stats.total_targets_presented
    }

    pub fn current_streak(&self) -> u32 {
        self.stats.current_streak
    }

    pub fn best_streak(&self) -> u32 {
        self.stats.best_streak
    }
}
