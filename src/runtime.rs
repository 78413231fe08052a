use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Terminal input consumed by the frame loop
#[derive(Clone, Debug)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait InputEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<InputEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(InputEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(InputEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("terminal input failed: {}", e);
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<InputEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx }
    }
}

impl InputEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// One paced frame: the input that arrived and the wall time since the previous frame.
#[derive(Debug)]
pub struct FrameTick {
    pub events: Vec<InputEvent>,
    pub dt: Duration,
}

/// Fixed-rate pacer that collects input while waiting for the next frame
pub struct Runner<E: InputEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    last_frame: Instant,
    deadline: Instant,
}

impl<E: InputEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let now = Instant::now();
        Self {
            deadline: now + ticker.interval(),
            event_source,
            ticker,
            last_frame: now,
        }
    }

    /// Blocks until the next frame boundary, gathering any events that arrive meanwhile
    pub fn next_frame(&mut self) -> FrameTick {
        let mut events = Vec::new();

        loop {
            let now = Instant::now();
            if now >= self.deadline {
                break;
            }
            match self.event_source.recv_timeout(self.deadline - now) {
                Ok(ev) => events.push(ev),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(self.deadline.saturating_duration_since(Instant::now()));
                    break;
                }
            }
        }

        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        // Don't try to catch up after a stall; just pace from here.
        self.deadline = (self.deadline + self.ticker.interval()).max(now);

        FrameTick { events, dt }
    }
}
