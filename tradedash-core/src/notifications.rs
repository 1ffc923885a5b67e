//! Notification list state and the fixed-interval poll timer.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::ApiClient;
use crate::domain::Notification;
use crate::error::ApiError;

/// How often the server is asked to generate new notifications.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    items: Vec<Notification>,
}

impl NotificationFeed {
    pub fn replace(&mut self, items: Vec<Notification>) {
        self.items = items;
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Local flag only; the caller sends the request.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }
}

/// One poll cycle: ask the server to poll, then re-fetch the list.
///
/// Failures are swallowed (logged at debug) except authentication failures,
/// which the caller must act on.
pub fn poll_cycle(client: &ApiClient) -> Result<Option<Vec<Notification>>, ApiError> {
    let outcome = client
        .poll_notifications()
        .and_then(|()| client.notifications());
    match outcome {
        Ok(items) => Ok(Some(items)),
        Err(e) if e.is_auth_failure() => Err(e),
        Err(e) => {
            debug!(error = %e, "notification poll failed");
            Ok(None)
        }
    }
}

/// Fixed-interval timer driven by the caller's event loop. Dropping it stops
/// polling; there is no background thread.
#[derive(Debug, Clone, Copy)]
pub struct PollTimer {
    interval: Duration,
    next_due: Instant,
}

impl PollTimer {
    /// First tick is one full interval from `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True once per elapsed interval. Missed intervals collapse into one
    /// tick instead of firing in a burst.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    pub fn reset(&mut self, now: Instant) {
        self.next_due = now + self.interval;
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, read: bool) -> Notification {
        Notification {
            id: id.into(),
            kind: Some("order_filled".into()),
            message: "filled".into(),
            read,
            created_at: None,
        }
    }

    #[test]
    fn feed_counts_and_mutates() {
        let mut feed = NotificationFeed::default();
        feed.replace(vec![note("1", false), note("2", true), note("3", false)]);
        assert_eq!(feed.unread_count(), 2);
        assert!(feed.mark_read("1"));
        assert!(!feed.mark_read("99"));
        assert_eq!(feed.unread_count(), 1);
        assert!(feed.remove("3"));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn timer_fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = PollTimer::new(POLL_INTERVAL, start);
        assert!(!timer.due(start + Duration::from_secs(14)));
        assert!(timer.due(start + Duration::from_secs(15)));
        assert!(!timer.due(start + Duration::from_secs(16)));
        // A long stall yields a single tick.
        assert!(timer.due(start + Duration::from_secs(120)));
        assert!(!timer.due(start + Duration::from_secs(121)));
        assert_eq!(
            timer.remaining(start + Duration::from_secs(121)),
            Duration::from_secs(14)
        );
    }
}
