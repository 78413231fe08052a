use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use distance_combo::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, GameConfig},
    engine::SessionEngine,
    input::KeyHold,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    signal::{parse_sample, ManualSignal, SignalSource, StreamingSignal},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Alignment,
    widgets::Paragraph,
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Stdout, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

const MONITOR_POLL: Duration = Duration::from_millis(100);

/// hold a marker on a moving target with an IR rangefinder or the arrow keys
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A reflex game: keep the marker on the target by moving your hand over an IR rangefinder (or with the arrow keys). Every target hit scores 100 points plus a bonus that grows with your streak."
)]
pub struct Cli {
    /// serial port the rangefinder firmware writes samples to
    #[clap(short = 'p', long)]
    port: Option<String>,

    /// serial baud rate
    #[clap(short = 'b', long)]
    baud: Option<u32>,

    /// milliseconds to wait after opening the port while the board resets
    #[clap(long)]
    settle_ms: Option<u64>,

    /// skip the sensor and play with the arrow keys
    #[clap(short = 'k', long, conflicts_with = "monitor")]
    keyboard: bool,

    /// frames per second of the game loop
    #[clap(long)]
    fps: Option<u32>,

    /// marker movement per frame while an arrow key is held
    #[clap(long)]
    step: Option<f64>,

    /// how long an arrow key counts as held after its last repeat, for terminals without key release events;
    /// values above the keyboard repeat delay avoid a pause at the start of a hold
    #[clap(long)]
    hold_grace_ms: Option<u64>,

    /// length of a session in seconds
    #[clap(short = 's', long)]
    session_secs: Option<f64>,

    /// seconds before the target moves
    #[clap(short = 't', long)]
    target_secs: Option<f64>,

    /// how far the marker may be from the target and still count as a hit
    #[clap(long)]
    tolerance: Option<f64>,

    /// seed for reproducible target sequences
    #[clap(long)]
    seed: Option<u64>,

    /// config file to read (and write with --save-config)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// store the effective settings in the config file
    #[clap(long)]
    save_config: bool,

    /// log file (defaults to the state directory); level via RUST_LOG
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// print raw samples from the sensor link instead of playing
    #[clap(short = 'm', long)]
    monitor: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored configuration
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(port) = &self.port {
            cfg.serial_port = port.clone();
        }
        if let Some(baud) = self.baud {
            cfg.baud_rate = baud;
        }
        if let Some(settle_ms) = self.settle_ms {
            cfg.settle_ms = settle_ms;
        }
        if let Some(fps) = self.fps {
            cfg.frames_per_second = fps;
        }
        if let Some(step) = self.step {
            cfg.keyboard_step = step;
        }
        if let Some(grace) = self.hold_grace_ms {
            cfg.hold_grace_ms = grace;
        }
        if let Some(secs) = self.session_secs {
            cfg.session_secs = secs;
        }
        if let Some(secs) = self.target_secs {
            cfg.target_secs = secs;
        }
        if let Some(tolerance) = self.tolerance {
            cfg.tolerance = tolerance;
        }
        cfg
    }

    fn config_store(&self) -> FileConfigStore {
        self.config
            .as_ref()
            .map(FileConfigStore::with_path)
            .unwrap_or_default()
    }
}

fn init_logging(path: Option<PathBuf>) {
    let Some(path) = path.or_else(AppDirs::log_path) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    // stdout belongs to the terminal UI, so logs only ever go to the file
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone());

    let store = cli.config_store();
    let cfg = cli.apply(store.load());

    let game = match cfg.game_config(cli.seed) {
        Ok(game) => game,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e).exit();
        }
    };

    if cli.save_config {
        store.save(&cfg)?;
        log::info!("settings saved to {}", store.path().display());
    }

    if cli.monitor {
        return run_monitor(&cfg);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let key_releases = matches!(supports_keyboard_enhancement(), Ok(true));
    if key_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &cli, &cfg, game, key_releases);
    let restored = restore_terminal(&mut terminal, key_releases);

    result?;
    restored?;
    Ok(())
}

/// Undo every terminal mode change, even when an earlier step fails
fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    key_releases: bool,
) -> io::Result<()> {
    let pop_flags = if key_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
    } else {
        Ok(())
    };
    first_error([
        pop_flags,
        disable_raw_mode(),
        execute!(terminal.backend_mut(), LeaveAlternateScreen),
        terminal.show_cursor(),
    ])
}

fn first_error(steps: impl IntoIterator<Item = io::Result<()>>) -> io::Result<()> {
    steps.into_iter().collect()
}

/// Probe the sensor link, falling back to keyboard control when it is unavailable
fn select_signal(cli: &Cli, cfg: &Config, keys: &KeyHold) -> Box<dyn SignalSource> {
    if !cli.keyboard {
        match StreamingSignal::open(&cfg.serial_port, cfg.baud_rate, cfg.settle_delay()) {
            Ok(signal) => return Box::new(signal),
            Err(e) => {
                log::warn!("{}", e);
                log::info!("using keyboard control");
            }
        }
    }
    Box::new(ManualSignal::new(cfg.keyboard_step, keys.clone()))
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    cli: &Cli,
    cfg: &Config,
    game: GameConfig,
    key_releases: bool,
) -> Result<(), Box<dyn Error>> {
    let keys = if key_releases {
        KeyHold::new()
    } else {
        KeyHold::with_grace(cfg.hold_grace())
    };

    if !cli.keyboard {
        let message = format!("connecting to sensor on {}...", cfg.serial_port);
        terminal.draw(|f| {
            f.render_widget(
                Paragraph::new(message.as_str()).alignment(Alignment::Center),
                f.area(),
            )
        })?;
    }
    let signal = select_signal(cli, cfg, &keys);
    log::info!("input source: {}", signal.kind());

    let mut app = App::new(SessionEngine::new(game), signal, keys);
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(cfg.frame_interval()),
    );

    terminal.draw(|f| f.render_widget(&app, f.area()))?;

    while !app.should_quit() {
        let frame = runner.next_frame();

        for event in &frame.events {
            app.handle_event(event);
        }
        if app.should_quit() {
            break;
        }

        app.on_frame(frame.dt);
        terminal.draw(|f| f.render_widget(&app, f.area()))?;
    }

    Ok(())
}

/// Print every line the sensor sends until the link goes away
fn run_monitor(cfg: &Config) -> Result<(), Box<dyn Error>> {
    println!("opening {} at {} baud...", cfg.serial_port, cfg.baud_rate);
    let mut signal = StreamingSignal::open(&cfg.serial_port, cfg.baud_rate, cfg.settle_delay())?;
    println!("port open, reading samples (ctrl+c to quit)");

    let mut stdout = io::stdout();
    while signal.is_linked() {
        for line in signal.poll_lines() {
            let raw = line.trim_end();
            match parse_sample(raw) {
                Some(value) => writeln!(stdout, "received: {raw} -> {value:.3}")?,
                None => writeln!(stdout, "received: {raw} (malformed)")?,
            }
        }
        thread::sleep(MONITOR_POLL);
    }

    println!("link closed");
    Ok(())
}
