//! Player control input, normalized to a single scalar in `[0, 1]`.
//!
//! Two sources share the [`SignalSource`] capability: [`ManualSignal`] steps a
//! value while arrow keys are held, [`StreamingSignal`] follows a line-based
//! sensor link (normally a serial port fed by the rangefinder firmware).

use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::input::{Direction, KeyHold};

/// Serial read timeout; only bounds how long the reader thread blocks.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Pause before reading again after a transport error.
const READ_RETRY: Duration = Duration::from_millis(50);

pub const INITIAL_VALUE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SignalKind {
    #[strum(serialize = "keyboard")]
    Manual,
    #[strum(serialize = "sensor")]
    Streaming,
}

pub trait SignalSource {
    /// Pull fresh input. Never blocks.
    fn refresh(&mut self);
    /// Latest value, always within `[0, 1]`.
    fn current_value(&self) -> f64;
    fn kind(&self) -> SignalKind;
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// Parses one sensor line. Blank, malformed and NaN lines yield `None`;
/// everything else, infinities included, is clamped into `[0, 1]`.
pub fn parse_sample(line: &str) -> Option<f64> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .map(|v| v.clamp(0.0, 1.0))
}

/// Keyboard-driven value that moves by `step` per refresh while a key is held.
#[derive(Debug, Clone)]
pub struct ManualSignal {
    value: f64,
    step: f64,
    keys: KeyHold,
}

impl ManualSignal {
    pub fn new(step: f64, keys: KeyHold) -> Self {
        Self {
            value: INITIAL_VALUE,
            step,
            keys,
        }
    }
}

impl SignalSource for ManualSignal {
    fn refresh(&mut self) {
        if self.keys.is_held(Direction::Increase) {
            self.value = (self.value + self.step).clamp(0.0, 1.0);
        }
        if self.keys.is_held(Direction::Decrease) {
            self.value = (self.value - self.step).clamp(0.0, 1.0);
        }
    }

    fn current_value(&self) -> f64 {
        self.value
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Manual
    }
}

/// Messages from the reader thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Line(String),
    Failed(String),
    Closed,
}

/// Sensor value fed by a background line reader.
#[derive(Debug)]
pub struct StreamingSignal {
    rx: Receiver<ChannelEvent>,
    value: f64,
    linked: bool,
    failing: bool,
}

impl StreamingSignal {
    /// Opens the serial link and waits `settle` for the board to come up.
    pub fn open(port: &str, baud_rate: u32, settle: Duration) -> Result<Self, SignalError> {
        let serial = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| SignalError::Open {
                port: port.to_string(),
                source,
            })?;

        log::info!("serial link open on {} at {} baud", port, baud_rate);
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        Ok(Self::from_reader(serial))
    }

    /// Streams lines from any byte source on a dedicated thread.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_channel(spawn_reader(reader))
    }

    pub fn from_channel(rx: Receiver<ChannelEvent>) -> Self {
        Self {
            rx,
            value: INITIAL_VALUE,
            linked: true,
            failing: false,
        }
    }

    /// Whether the reader is still running. Read errors do not end the link.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Drains every line buffered so far without blocking.
    pub fn poll_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(ChannelEvent::Line(line)) => {
                    if self.failing {
                        log::info!("sensor readings resumed");
                        self.failing = false;
                    }
                    lines.push(line);
                }
                Ok(ChannelEvent::Failed(reason)) => {
                    // One warning per run of failures
                    if !self.failing {
                        log::warn!(
                            "sensor read failed: {}; keeping last value {:.3}",
                            reason,
                            self.value
                        );
                        self.failing = true;
                    }
                }
                Ok(ChannelEvent::Closed) => self.mark_unlinked("sensor stream closed"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.mark_unlinked("sensor reader stopped");
                    break;
                }
            }
        }
        lines
    }

    fn mark_unlinked(&mut self, reason: &str) {
        if self.linked {
            log::warn!("{}; keeping last value {:.3}", reason, self.value);
            self.linked = false;
        }
    }
}

impl SignalSource for StreamingSignal {
    fn refresh(&mut self) {
        let lines = self.poll_lines();
        let latest = lines.iter().filter_map(|line| parse_sample(line)).last();
        if let Some(value) = latest {
            self.value = value;
        }
    }

    fn current_value(&self) -> f64 {
        self.value
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Streaming
    }
}

fn spawn_reader<R: Read + Send + 'static>(reader: R) -> Receiver<ChannelEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    let _ = tx.send(ChannelEvent::Closed);
                    break;
                }
                Ok(_) => {
                    // A chunk without a newline means EOF cut the line short.
                    if buf.last() == Some(&b'\n') {
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        buf.clear();
                        if tx.send(ChannelEvent::Line(line)).is_err() {
                            break;
                        }
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    buf.clear();
                    if tx.send(ChannelEvent::Failed(e.to_string())).is_err() {
                        break;
                    }
                    thread::sleep(READ_RETRY);
                }
            }
        }
    });

    rx
}
