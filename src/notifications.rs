use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Danger,
    Info,
}

impl Severity {
    /// Success when the backend says so, warning otherwise.
    pub fn from_outcome(success: bool) -> Self {
        if success { Severity::Success } else { Severity::Warning }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub shown_at: Instant,
}

/// Stack of inline banners, newest first.
#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    stack: Vec<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        NotificationCenter::new(DEFAULT_TTL)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        NotificationCenter {
            ttl,
            stack: Vec::new(),
        }
    }

    pub fn show(&mut self, message: impl Into<String>, severity: Severity) -> Uuid {
        self.show_at(message, severity, Instant::now())
    }

    pub fn show_at(&mut self, message: impl Into<String>, severity: Severity, now: Instant) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            severity,
            message: message.into(),
            shown_at: now,
        };
        let id = notification.id;
        self.stack.insert(0, notification);
        id
    }

    /// Returns false if the banner had already gone (dismissed or expired).
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.stack.len();
        self.stack.retain(|n| n.id != id);
        self.stack.len() != before
    }

    pub fn dismiss_latest(&mut self) -> bool {
        if self.stack.is_empty() {
            return false;
        }
        self.stack.remove(0);
        true
    }

    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.stack
            .retain(|n| now.saturating_duration_since(n.shown_at) < ttl);
    }

    pub fn visible(&self) -> &[Notification] {
        &self.stack
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut center = NotificationCenter::default();
        center.show("first", Severity::Info);
        center.show("second", Severity::Success);

        let messages: Vec<_> = center.visible().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[test]
    fn test_each_banner_expires_independently() {
        let mut center = NotificationCenter::default();
        let start = Instant::now();
        center.show_at("old", Severity::Warning, start);
        center.show_at("new", Severity::Danger, start + Duration::from_secs(3));

        center.expire(start + Duration::from_secs(4));
        assert_eq!(center.visible().len(), 2);

        center.expire(start + Duration::from_secs(5));
        assert_eq!(center.visible().len(), 1);
        assert_eq!(center.visible()[0].message, "new");

        center.expire(start + Duration::from_secs(8));
        assert!(center.is_empty());
    }

    #[test]
    fn test_dismiss_before_timeout() {
        let mut center = NotificationCenter::default();
        let keep = center.show("keep", Severity::Info);
        let drop = center.show("drop", Severity::Info);

        assert!(center.dismiss(drop));
        assert!(!center.dismiss(drop));
        assert_eq!(center.visible()[0].id, keep);
    }

    #[test]
    fn test_outcome_severity() {
        assert_eq!(Severity::from_outcome(true), Severity::Success);
        assert_eq!(Severity::from_outcome(false), Severity::Warning);
    }
}
