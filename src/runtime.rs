use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

use crate::session::METRICS_TICK;

/// What the main loop reacts to. `Tick` means nothing arrived in time.
#[derive(Clone, Debug)]
pub enum RaceEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Anything that can hand the loop its next input.
pub trait RaceEventSource {
    /// Waits up to `timeout`. `None` on timeout or once the source is gone.
    fn next_event(&self, timeout: Duration) -> Option<RaceEvent>;
}

impl RaceEventSource for Receiver<RaceEvent> {
    fn next_event(&self, timeout: Duration) -> Option<RaceEvent> {
        self.recv_timeout(timeout).ok()
    }
}

/// Maps a terminal event onto the loop's events; everything else is dropped.
pub fn translate(ev: Event) -> Option<RaceEvent> {
    match ev {
        // windows reports releases too
        Event::Key(key) if key.kind == KeyEventKind::Release => None,
        Event::Key(key) => Some(RaceEvent::Key(key)),
        Event::Resize(..) => Some(RaceEvent::Resize),
        _ => None,
    }
}

/// Reads the terminal on its own thread and forwards translated events.
/// The thread ends when the receiver is dropped or input fails.
pub fn spawn_terminal_reader() -> Receiver<RaceEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || loop {
        let ev = match event::read() {
            Ok(ev) => ev,
            Err(e) => {
                tracing::error!(error = %e, "terminal input closed");
                return;
            }
        };
        if let Some(race_event) = translate(ev) {
            if tx.send(race_event).is_err() {
                return;
            }
        }
    });
    rx
}

/// Pulls one event per step, falling back to a tick so session timers
/// are polled at least every `tick`.
pub struct Runner<S> {
    source: S,
    tick: Duration,
}

impl<S: RaceEventSource> Runner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tick: METRICS_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn step(&self) -> RaceEvent {
        self.source.next_event(self.tick).unwrap_or(RaceEvent::Tick)
    }
}
