use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Every(Duration),
    Once,
}

/// A deadline owned by whoever armed it. Dropping or replacing the handle
/// cancels it; nothing fires unless the owner polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    due: Instant,
    repeat: Repeat,
}

impl Timer {
    /// Fires every `period`, first at `armed_at + period`.
    pub fn repeating(armed_at: Instant, period: Duration) -> Self {
        Self {
            due: armed_at + period,
            repeat: Repeat::Every(period),
        }
    }

    /// Fires once at `armed_at + delay`.
    pub fn once(armed_at: Instant, delay: Duration) -> Self {
        Self {
            due: armed_at + delay,
            repeat: Repeat::Once,
        }
    }

    pub fn due(&self) -> Instant {
        self.due
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.due.saturating_duration_since(now)
    }

    /// Number of deadlines passed since the last poll. A one-shot timer
    /// returns at most 1 and must then be dropped by the owner.
    pub fn poll(&mut self, now: Instant) -> u32 {
        if now < self.due {
            return 0;
        }
        match self.repeat {
            Repeat::Once => 1,
            Repeat::Every(period) if period.is_zero() => 1,
            Repeat::Every(period) => {
                let mut fired = 0;
                while self.due <= now {
                    self.due += period;
                    fired += 1;
                }
                fired
            }
        }
    }
}

/// Polls an optional timer, dropping one-shot timers after they fire.
pub fn poll_slot(slot: &mut Option<Timer>, now: Instant) -> u32 {
    let Some(timer) = slot.as_mut() else {
        return 0;
    };
    let fired = timer.poll(now);
    if fired > 0 && timer.repeat == Repeat::Once {
        *slot = None;
    }
    fired
}
