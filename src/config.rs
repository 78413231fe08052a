use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SESSION_DURATION_SECS: f64 = 30.0;
pub const TARGET_DURATION_SECS: f64 = 2.0;
pub const TARGET_TOLERANCE: f64 = 0.06;
pub const TARGET_MIN: f64 = 0.1;
pub const TARGET_MAX: f64 = 0.9;
pub const BASE_POINTS: u64 = 100;
pub const STREAK_BONUS: u64 = 10;

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("session duration must be a positive number of seconds, got {0}")]
    SessionDuration(f64),
    #[error("target duration must be a positive number of seconds, got {0}")]
    TargetDuration(f64),
    #[error("tolerance must lie in (0, 0.5), got {0}")]
    Tolerance(f64),
    #[error("target range ({min}, {max}) must be an ordered range inside [0, 1]")]
    TargetRange { min: f64, max: f64 },
    #[error("keyboard step must lie in (0, 1], got {0}")]
    Step(f64),
    #[error("frame rate must be between 1 and 240, got {0}")]
    FrameRate(u32),
}

/// Immutable rules for one game, handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub session_secs: f64,
    pub target_secs: f64,
    pub tolerance: f64,
    pub target_min: f64,
    pub target_max: f64,
    pub base_points: u64,
    pub streak_bonus: u64,
    /// Seed for target generation; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            session_secs: SESSION_DURATION_SECS,
            target_secs: TARGET_DURATION_SECS,
            tolerance: TARGET_TOLERANCE,
            target_min: TARGET_MIN,
            target_max: TARGET_MAX,
            base_points: BASE_POINTS,
            streak_bonus: STREAK_BONUS,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.session_secs.is_finite() && self.session_secs > 0.0) {
            return Err(ConfigError::SessionDuration(self.session_secs));
        }
        if !(self.target_secs.is_finite() && self.target_secs > 0.0) {
            return Err(ConfigError::TargetDuration(self.target_secs));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 0.5) {
            return Err(ConfigError::Tolerance(self.tolerance));
        }
        let range_ok = self.target_min >= 0.0
            && self.target_max <= 1.0
            && self.target_min < self.target_max;
        if !range_ok {
            return Err(ConfigError::TargetRange {
                min: self.target_min,
                max: self.target_max,
            });
        }
        Ok(())
    }

    /// Points awarded for a hit that brings the streak to `streak`.
    pub fn points_for(&self, streak: u32) -> u64 {
        self.base_points + self.streak_bonus * u64::from(streak)
    }
}

/// User preferences stored on disk and overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial_port: String,
    pub baud_rate: u32,
    pub settle_ms: u64,
    pub frames_per_second: u32,
    pub keyboard_step: f64,
    pub hold_grace_ms: u64,
    pub session_secs: f64,
    pub target_secs: f64,
    pub tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            settle_ms: 2000,
            frames_per_second: 60,
            keyboard_step: 0.01,
            hold_grace_ms: 120,
            session_secs: SESSION_DURATION_SECS,
            target_secs: TARGET_DURATION_SECS,
            tolerance: TARGET_TOLERANCE,
        }
    }
}

impl Config {
    pub fn game_config(&self, seed: Option<u64>) -> Result<GameConfig, ConfigError> {
        if !(self.keyboard_step > 0.0 && self.keyboard_step <= 1.0) {
            return Err(ConfigError::Step(self.keyboard_step));
        }
        if !(1..=240).contains(&self.frames_per_second) {
            return Err(ConfigError::FrameRate(self.frames_per_second));
        }
        let game = GameConfig {
            session_secs: self.session_secs,
            target_secs: self.target_secs,
            tolerance: self.tolerance,
            seed,
            ..GameConfig::default()
        };
        game.validate()?;
        Ok(game)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frames_per_second.max(1)))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn hold_grace(&self) -> Duration {
        Duration::from_millis(self.hold_grace_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "distance-combo") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("distance_combo_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring malformed config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            serial_port: "/dev/cu.usbmodem11401".into(),
            baud_rate: 9600,
            settle_ms: 0,
            frames_per_second: 30,
            keyboard_step: 0.02,
            hold_grace_ms: 200,
            session_secs: 10.0,
            target_secs: 1.5,
            tolerance: 0.05,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "serial_port": "COM3" }"#).unwrap();
        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.serial_port, "COM3");
        assert_eq!(loaded.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(loaded.session_secs, SESSION_DURATION_SECS);
    }

    #[test]
    fn default_game_config_matches_rules() {
        let game = Config::default().game_config(None).unwrap();
        assert_eq!(game, GameConfig::default());
        assert_eq!(game.session_secs, 30.0);
        assert_eq!(game.target_secs, 2.0);
        assert_eq!(game.tolerance, 0.06);
    }

    #[test]
    fn points_use_streak_after_increment() {
        let game = GameConfig::default();
        assert_eq!(game.points_for(1), 110);
        assert_eq!(game.points_for(5), 150);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cfg = Config {
            session_secs: 0.0,
            ..Config::default()
        };
        assert_matches!(cfg.game_config(None), Err(ConfigError::SessionDuration(_)));

        let cfg = Config {
            target_secs: -1.0,
            ..Config::default()
        };
        assert_matches!(cfg.game_config(None), Err(ConfigError::TargetDuration(_)));

        let cfg = Config {
            tolerance: 0.5,
            ..Config::default()
        };
        assert_matches!(cfg.game_config(None), Err(ConfigError::Tolerance(_)));

        let cfg = Config {
            keyboard_step: 0.0,
            ..Config::default()
        };
        assert_matches!(cfg.game_config(None), Err(ConfigError::Step(_)));

        let cfg = Config {
            frames_per_second: 0,
            ..Config::default()
        };
        assert_matches!(cfg.game_config(None), Err(ConfigError::FrameRate(0)));

        let game = GameConfig {
            target_min: 0.9,
            target_max: 0.1,
            ..GameConfig::default()
        };
        assert_matches!(game.validate(), Err(ConfigError::TargetRange { .. }));
    }

    #[test]
    fn frame_interval_follows_rate() {
        let cfg = Config {
            frames_per_second: 50,
            ..Config::default()
        };
        assert_eq!(cfg.frame_interval(), Duration::from_millis(20));
    }
}
