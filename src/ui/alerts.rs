//! Transient alert banners: dismissible, auto-expiring after five
//! seconds, never retried.

use std::time::{Duration, Instant};

pub const ALERT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: u64,
    pub level: AlertLevel,
    pub msg: String,
    raised_at: Instant,
}

#[derive(Debug, Default)]
pub struct Alerts {
    items: Vec<Alert>,
    next_id: u64,
}

impl Alerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: AlertLevel, msg: impl Into<String>) -> u64 {
        self.push_at(level, msg, Instant::now())
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|a| a.id != id);
    }

    /// Drops alerts older than the TTL; the shell calls this on ticks.
    pub fn sweep(&mut self) {
        self.sweep_at(Instant::now());
    }

    pub fn active(&self) -> &[Alert] {
        &self.items
    }

    fn push_at(&mut self, level: AlertLevel, msg: impl Into<String>, at: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Alert {
            id,
            level,
            msg: msg.into(),
            raised_at: at,
        });
        id
    }

    fn sweep_at(&mut self, now: Instant) {
        self.items
            .retain(|a| now.duration_since(a.raised_at) < ALERT_TTL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_expire_after_ttl() {
        let start = Instant::now();
        let mut alerts = Alerts::new();
        alerts.push_at(AlertLevel::Error, "Name is required", start);
        alerts.push_at(AlertLevel::Success, "Student created", start + Duration::from_secs(3));

        alerts.sweep_at(start + Duration::from_secs(4));
        assert_eq!(alerts.active().len(), 2);

        alerts.sweep_at(start + Duration::from_secs(6));
        let remaining: Vec<_> = alerts.active().iter().map(|a| a.msg.as_str()).collect();
        assert_eq!(remaining, vec!["Student created"]);

        alerts.sweep_at(start + Duration::from_secs(9));
        assert!(alerts.active().is_empty());
    }

    #[test]
    fn dismiss_removes_only_the_target() {
        let mut alerts = Alerts::new();
        let first = alerts.push(AlertLevel::Error, "one");
        let _second = alerts.push(AlertLevel::Error, "two");

        alerts.dismiss(first);
        let remaining: Vec<_> = alerts.active().iter().map(|a| a.msg.as_str()).collect();
        assert_eq!(remaining, vec!["two"]);
    }
}
