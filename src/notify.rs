use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(5);
// Server-side failures stay on screen longer.
pub const SERVER_ERROR_LIFETIME: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
    pub lifetime: Duration,
    created_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.lifetime
    }
}

#[derive(Debug, Default)]
pub struct Notifier {
    next_id: u64,
    active: Vec<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(Level::Success, message, DEFAULT_LIFETIME)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.push(Level::Warning, message, DEFAULT_LIFETIME)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(Level::Error, message, DEFAULT_LIFETIME)
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>, lifetime: Duration) -> u64 {
        let message = message.into();
        match level {
            Level::Success => info!("{}", message),
            Level::Warning => warn!("{}", message),
            Level::Error => error!("{}", message),
        }
        self.next_id += 1;
        self.active.push(Notification {
            id: self.next_id,
            level,
            message,
            lifetime,
            created_at: Instant::now(),
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|n| !n.is_expired(now));
        before - self.active.len()
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.last()
    }
}
