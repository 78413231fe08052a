use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::engine::Action;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

/// What a key press means to the app in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Action(Action),
    Hold(Direction),
    Release(Direction),
    Quit,
}

/// Maps a terminal key event to a command, if it means anything in `state`.
pub fn command_for_key(state: SessionState, key: &KeyEvent) -> Option<Command> {
    let direction = match key.code {
        KeyCode::Up => Some(Direction::Increase),
        KeyCode::Down => Some(Direction::Decrease),
        _ => None,
    };
    if let Some(direction) = direction {
        return match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => Some(Command::Hold(direction)),
            KeyEventKind::Release => Some(Command::Release(direction)),
        };
    }

    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    match (state, key.code) {
        (_, KeyCode::Char('q')) => Some(Command::Quit),
        (SessionState::Menu, KeyCode::Char(' ')) => Some(Command::Action(Action::Start)),
        (SessionState::Menu, KeyCode::Esc) => Some(Command::Quit),
        (SessionState::GameOver, KeyCode::Char('r') | KeyCode::Char('R')) => {
            Some(Command::Action(Action::Restart))
        }
        (SessionState::GameOver, KeyCode::Esc) => Some(Command::Action(Action::ReturnToMenu)),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct HoldState {
    increase: Option<Instant>,
    decrease: Option<Instant>,
    grace: Option<Duration>,
}

impl HoldState {
    fn slot(&mut self, direction: Direction) -> &mut Option<Instant> {
        match direction {
            Direction::Increase => &mut self.increase,
            Direction::Decrease => &mut self.decrease,
        }
    }
}

/// Shared view of which direction keys are currently held.
///
/// Terminals that report key releases give exact hold tracking. Otherwise a
/// press or auto-repeat keeps the key held for a short grace period.
#[derive(Debug, Clone, Default)]
pub struct KeyHold {
    inner: Rc<RefCell<HoldState>>,
}

impl KeyHold {
    /// Hold tracking driven by release events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold tracking for terminals without release events.
    pub fn with_grace(grace: Duration) -> Self {
        let hold = Self::default();
        hold.inner.borrow_mut().grace = Some(grace);
        hold
    }

    pub fn press(&self, direction: Direction) {
        self.press_at(direction, Instant::now());
    }

    pub fn press_at(&self, direction: Direction, at: Instant) {
        *self.inner.borrow_mut().slot(direction) = Some(at);
    }

    pub fn release(&self, direction: Direction) {
        *self.inner.borrow_mut().slot(direction) = None;
    }

    pub fn clear(&self) {
        self.release(Direction::Increase);
        self.release(Direction::Decrease);
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.is_held_at(direction, Instant::now())
    }

    pub fn is_held_at(&self, direction: Direction, now: Instant) -> bool {
        let mut state = self.inner.borrow_mut();
        let grace = state.grace;
        match (*state.slot(direction), grace) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(pressed), Some(grace)) => now.saturating_duration_since(pressed) <= grace,
        }
    }
}
