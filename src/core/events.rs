//! Unified event handling system

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::advisory::AnalysisResult;

/// All possible events in the system
#[derive(Debug, Clone)]
pub enum Event {
    // Input events
    Key(KeyEvent),
    Resize(u16, u16),

    // Housekeeping tick (notification expiry)
    Tick,
    // Simulation clock
    SimTick,

    // Async completion events
    AdvisoryDone {
        generation: u64,
        result: Result<AnalysisResult, String>,
    },
}

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new() -> (Self, mpsc::UnboundedSender<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }

    /// Start all event source tasks
    pub fn spawn_sources(event_tx: mpsc::UnboundedSender<Event>, sim_period: Duration) {
        tokio::spawn(Self::terminal_events(event_tx.clone()));

        tokio::spawn(Self::tick_events(
            event_tx.clone(),
            Duration::from_millis(250),
            Event::Tick,
        ));

        // A slow frame drops ticks instead of bursting to catch up.
        tokio::spawn(Self::tick_events(event_tx, sim_period, Event::SimTick));
    }

    async fn terminal_events(tx: mpsc::UnboundedSender<Event>) {
        use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};
        use futures::StreamExt;

        let mut reader = event::EventStream::new();
        while let Some(event_result) = reader.next().await {
            let event = match event_result {
                Ok(CrosstermEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    Event::Key(key)
                }
                Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("terminal event stream failed: {}", e);
                    break;
                }
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    }

    async fn tick_events(tx: mpsc::UnboundedSender<Event>, period: Duration, event: Event) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if tx.send(event.clone()).is_err() {
                break;
            }
        }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Key binding helper
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// Character keys ignore SHIFT since terminals disagree on reporting it.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if event.code != self.key {
            return false;
        }
        match self.key {
            KeyCode::Char(_) => event.modifiers.difference(KeyModifiers::SHIFT) == self.modifiers,
            _ => event.modifiers == self.modifiers,
        }
    }
}

/// Standard key bindings
pub struct KeyBindings;

impl KeyBindings {
    pub fn quit() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('q'))
    }

    pub fn quit_alt() -> KeyBinding {
        KeyBinding::ctrl(KeyCode::Char('c'))
    }

    pub fn help() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('?'))
    }

    pub fn shell() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('`'))
    }

    pub fn kill() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('x'))
    }

    pub fn renice() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('n'))
    }

    pub fn toggle() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('s'))
    }

    pub fn stress() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('m'))
    }

    pub fn advisory() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('a'))
    }

    pub fn pause() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('p'))
    }

    pub fn sort() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('o'))
    }

    pub fn clear_alerts() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('c'))
    }

    pub fn clear_logs() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('l'))
    }

    pub fn escape() -> KeyBinding {
        KeyBinding::new(KeyCode::Esc)
    }

    pub fn enter() -> KeyBinding {
        KeyBinding::new(KeyCode::Enter)
    }

    pub fn tab() -> KeyBinding {
        KeyBinding::new(KeyCode::Tab)
    }

    pub fn backtab() -> KeyBinding {
        KeyBinding {
            key: KeyCode::BackTab,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn up() -> KeyBinding {
        KeyBinding::new(KeyCode::Up)
    }

    pub fn down() -> KeyBinding {
        KeyBinding::new(KeyCode::Down)
    }

    pub fn vim_up() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('k'))
    }

    pub fn vim_down() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('j'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn char_bindings_ignore_shift() {
        assert!(KeyBindings::help().matches(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)));
        assert!(KeyBindings::help().matches(&key(KeyCode::Char('?'), KeyModifiers::NONE)));
        assert!(!KeyBindings::quit().matches(&key(KeyCode::Char('q'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn ctrl_c_is_distinct_from_clear() {
        let ctrl_c = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(KeyBindings::quit_alt().matches(&ctrl_c));
        assert!(!KeyBindings::clear_alerts().matches(&ctrl_c));
    }

    #[test]
    fn backtab_requires_shift() {
        assert!(KeyBindings::backtab().matches(&key(KeyCode::BackTab, KeyModifiers::SHIFT)));
        assert!(!KeyBindings::tab().matches(&key(KeyCode::BackTab, KeyModifiers::SHIFT)));
    }
}
