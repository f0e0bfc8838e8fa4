//! Bounded feed of transient player-facing events.

use std::collections::VecDeque;

use chrono::Local;

const MAX_NOTIFICATIONS: usize = 50;
const READ_AFTER_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    System,
    Error,
    Upgrade,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub reward: u64,
    pub stamp: String,
    pub read: bool,
    created_ms: i64,
}

/// Newest-first queue capped at [`MAX_NOTIFICATIONS`]. Entries flip to
/// read on their own once the sweep observes them five seconds old.
#[derive(Debug, Default)]
pub struct Notifications {
    entries: VecDeque<Notification>,
    next_id: u64,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.push_reward(kind, message, 0);
    }

    pub fn push_reward(&mut self, kind: NotificationKind, message: impl Into<String>, reward: u64) {
        let entry = Notification {
            id: self.next_id,
            kind,
            message: message.into(),
            reward,
            stamp: Local::now().format("%H:%M:%S").to_string(),
            read: false,
            created_ms: chrono::Utc::now().timestamp_millis(),
        };
        self.next_id += 1;
        log::debug!("notification {} ({:?}): {}", entry.id, entry.kind, entry.message);
        self.entries.push_front(entry);
        while self.entries.len() > MAX_NOTIFICATIONS {
            self.entries.pop_back();
        }
    }

    /// Auto-read pass, driven by the reconciler tick. Each entry ages
    /// independently of the others.
    pub fn sweep(&mut self, now_ms: i64) {
        for entry in self.entries.iter_mut() {
            if !entry.read && now_ms - entry.created_ms >= READ_AFTER_MS {
                entry.read = true;
            }
        }
    }

    pub fn unread(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
