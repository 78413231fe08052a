// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds the CLI, logging setup and the terminal loop.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod input;
pub mod runtime;
pub mod session;
pub mod signal;
pub mod ui;

pub use app::App;
pub use config::{Config, GameConfig};
pub use engine::{Action, SessionEngine, TickReport};
pub use session::SessionState;
pub use signal::{ManualSignal, SignalSource, StreamingSignal};
