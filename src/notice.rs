//! User-visible, non-blocking notices.
//!
//! Failures are turned into notices at the boundary where they happen. The
//! HTTP surface drains them with `GET /notices`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

/// Pending notices kept for a client that is not polling; older ones are dropped.
pub const MAX_PENDING: usize = 100;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Cloneable handle to the pending notice queue.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    fn push(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Error => error!(notice = %message, "Notice"),
            _ => info!(notice = %message, "Notice"),
        }
        let notice = Notice {
            level,
            message,
            at: Utc::now(),
        };
        // A poisoned queue only means a panic elsewhere; keep delivering.
        let mut queue = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        if queue.len() >= MAX_PENDING {
            queue.pop_front();
            debug!("Notice queue full, dropped the oldest notice");
        }
        queue.push_back(notice);
    }

    /// Removes and returns every pending notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        let mut queue = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_in_order_and_empties() {
        let notices = Notices::new();
        let handle = notices.clone();
        notices.error("first");
        handle.success("second");

        let drained = notices.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NoticeLevel::Error);
        assert_eq!(drained[1].message, "second");
        assert!(handle.is_empty());
    }

    #[test]
    fn queue_keeps_only_the_newest_notices() {
        let notices = Notices::new();
        for i in 0..MAX_PENDING + 5 {
            notices.info(format!("notice {i}"));
        }
        assert_eq!(notices.len(), MAX_PENDING);

        let drained = notices.drain();
        assert_eq!(drained[0].message, "notice 5");
        assert_eq!(drained[MAX_PENDING - 1].message, format!("notice {}", MAX_PENDING + 4));
    }
}
