use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::achievements::AchievementId;

/// How long an unlock banner stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: AchievementId,
    pub expires_at: Instant,
}

/// Unlock banners, oldest first.
#[derive(Debug, Default)]
pub struct AchievementToasts {
    toasts: VecDeque<Toast>,
}

impl AchievementToasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ids: &[AchievementId], now: Instant) {
        self.toasts.extend(ids.iter().map(|&id| Toast {
            id,
            expires_at: now + TOAST_TTL,
        }));
    }

    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    pub fn active(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }
}
