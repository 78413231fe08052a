use crate::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    Menu,
    Playing,
    GameOver,
}

/// The position the marker must reach in the current round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub value: f64,
    pub hit_this_round: bool,
}

impl Target {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            hit_this_round: false,
        }
    }

    pub fn contains(&self, v: f64, tolerance: f64) -> bool {
        (v - self.value).abs() <= tolerance
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub score: u64,
    pub total_targets_presented: u32,
    pub hits: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl SessionStats {
    /// Records a hit and returns the points it was worth.
    pub fn register_hit(&mut self, config: &GameConfig) -> u64 {
        self.hits += 1;
        self.current_streak += 1;
        self.best_streak = self.best_streak.max(self.current_streak);

        let points = config.points_for(self.current_streak);
        self.score += points;
        points
    }

    /// Closes a round. A round that ended without a hit breaks the streak.
    pub fn close_round(&mut self, was_hit: bool) {
        if !was_hit {
            self.current_streak = 0;
        }
        self.total_targets_presented += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timers {
    pub session_elapsed: f64,
    pub target_elapsed: f64,
}

impl Timers {
    pub fn advance(&mut self, dt: f64) {
        self.session_elapsed += dt;
        self.target_elapsed += dt;
    }
}
