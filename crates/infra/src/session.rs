//! Idle timeout: warn after a quiet period, log out after a longer one.
//!
//! `IdleTracker` is the pure state machine. `IdleWatcher` drives it with
//! tokio timers and callbacks; `SessionRegistry` applies it server-side to
//! every JWT session id.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use stowline_core::{DomainError, SessionId, UserId};

pub const DEFAULT_WARNING: Duration = Duration::from_secs(28 * 60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    warning_after: Duration,
    logout_after: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self { warning_after: DEFAULT_WARNING, logout_after: DEFAULT_TIMEOUT }
    }
}

impl IdleConfig {
    pub fn new(warning_after: Duration, logout_after: Duration) -> Result<Self, DomainError> {
        if warning_after.is_zero() || warning_after >= logout_after {
            return Err(DomainError::validation("idle warning must come before logout"));
        }
        Ok(Self { warning_after, logout_after })
    }

    pub fn warning_after(&self) -> Duration {
        self.warning_after
    }

    pub fn logout_after(&self) -> Duration {
        self.logout_after
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleEvent {
    Warning,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleState {
    Active,
    Warned,
    LoggedOut,
}

#[derive(Debug, Clone)]
pub struct IdleTracker {
    config: IdleConfig,
    last_activity: Instant,
    state: IdleState,
}

impl IdleTracker {
    pub fn new(config: IdleConfig, now: Instant) -> Self {
        Self { config, last_activity: now, state: IdleState::Active }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    /// Record activity. Returns false (and does nothing) once logged out.
    pub fn activity(&mut self, now: Instant) -> bool {
        if self.state == IdleState::LoggedOut {
            return false;
        }
        self.last_activity = now;
        self.state = IdleState::Active;
        true
    }

    /// Advance to `now`, returning the event that became due, if any.
    /// Logout is returned at most once; a skipped warning is not replayed.
    pub fn poll(&mut self, now: Instant) -> Option<IdleEvent> {
        let idle = now.saturating_duration_since(self.last_activity);
        match self.state {
            IdleState::LoggedOut => None,
            _ if idle >= self.config.logout_after => {
                self.state = IdleState::LoggedOut;
                Some(IdleEvent::Logout)
            }
            IdleState::Active if idle >= self.config.warning_after => {
                self.state = IdleState::Warned;
                Some(IdleEvent::Warning)
            }
            _ => None,
        }
    }

    /// When `poll` will next have something to report.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            IdleState::Active => Some(self.last_activity + self.config.warning_after),
            IdleState::Warned => Some(self.last_activity + self.config.logout_after),
            IdleState::LoggedOut => None,
        }
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn expires_in(&self, now: Instant) -> Duration {
        self.config.logout_after.saturating_sub(self.idle_for(now))
    }
}

/// Runs an `IdleTracker` on a background task and reports events through a
/// callback. Dropping the watcher stops it.
pub struct IdleWatcher {
    activity: mpsc::UnboundedSender<Instant>,
    task: JoinHandle<()>,
}

impl IdleWatcher {
    pub fn spawn<F>(config: IdleConfig, on_event: F) -> Self
    where
        F: Fn(IdleEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Instant>();
        let task = tokio::spawn(async move {
            let mut tracker = IdleTracker::new(config, Instant::now());
            while let Some(deadline) = tracker.next_deadline() {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(at) => {
                            tracker.activity(at);
                        }
                        None => break,
                    },
                    _ = sleep_until(deadline) => {
                        if let Some(event) = tracker.poll(Instant::now()) {
                            on_event(event);
                        }
                    }
                }
            }
        });
        Self { activity: tx, task }
    }

    pub fn touch(&self) {
        let _ = self.activity.send(Instant::now());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for IdleWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown session")]
    Unknown,
    #[error("session expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: IdleState,
    pub idle_secs: u64,
    pub expires_in_secs: u64,
    pub warning_after_secs: u64,
}

struct SessionEntry {
    user_id: UserId,
    tracker: IdleTracker,
}

/// Server-side idle tracking keyed by session id.
pub struct SessionRegistry {
    config: IdleConfig,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(config: IdleConfig) -> Self {
        Self { config, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> IdleConfig {
        self.config
    }

    pub fn open(&self, sid: SessionId, user_id: UserId) {
        if let Ok(mut map) = self.sessions.write() {
            map.insert(sid, SessionEntry { user_id, tracker: IdleTracker::new(self.config, Instant::now()) });
            debug!(session_id = %sid, user_id = %user_id, "session opened");
        }
    }

    /// Record activity on a live session.
    pub fn touch(&self, sid: SessionId) -> Result<SessionStatus, SessionError> {
        self.with_session(sid, |tracker, now| {
            tracker.activity(now);
        })
    }

    /// Inspect a session without counting as activity.
    pub fn status(&self, sid: SessionId) -> Result<SessionStatus, SessionError> {
        self.with_session(sid, |_, _| {})
    }

    pub fn end(&self, sid: SessionId) -> bool {
        self.sessions.write().map(|mut m| m.remove(&sid).is_some()).unwrap_or(false)
    }

    /// Drop sessions that have timed out; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let Ok(mut map) = self.sessions.write() else {
            return 0;
        };
        let before = map.len();
        map.retain(|_, s| {
            s.tracker.poll(now);
            s.tracker.state() != IdleState::LoggedOut
        });
        before - map.len()
    }

    fn with_session(
        &self,
        sid: SessionId,
        f: impl FnOnce(&mut IdleTracker, Instant),
    ) -> Result<SessionStatus, SessionError> {
        let now = Instant::now();
        let mut map = self.sessions.write().map_err(|_| SessionError::Unknown)?;
        let entry = map.get_mut(&sid).ok_or(SessionError::Unknown)?;

        while let Some(event) = entry.tracker.poll(now) {
            if event == IdleEvent::Logout {
                info!(session_id = %sid, user_id = %entry.user_id, "session timed out");
            }
        }
        if entry.tracker.state() == IdleState::LoggedOut {
            return Err(SessionError::Expired);
        }

        f(&mut entry.tracker, now);
        Ok(SessionStatus {
            state: entry.tracker.state(),
            idle_secs: entry.tracker.idle_for(now).as_secs(),
            expires_in_secs: entry.tracker.expires_in(now).as_secs(),
            warning_after_secs: self.config.warning_after.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep;

    const MIN: Duration = Duration::from_secs(60);

    #[test]
    fn config_requires_warning_before_logout() {
        assert!(IdleConfig::new(30 * MIN, 28 * MIN).is_err());
        assert!(IdleConfig::new(Duration::ZERO, MIN).is_err());
        assert_eq!(IdleConfig::default().logout_after(), 30 * MIN);
    }

    #[tokio::test(start_paused = true)]
    async fn tracker_warns_then_logs_out_once() {
        let start = Instant::now();
        let mut t = IdleTracker::new(IdleConfig::default(), start);

        assert_eq!(t.poll(start + 27 * MIN), None);
        assert_eq!(t.poll(start + 28 * MIN), Some(IdleEvent::Warning));
        assert_eq!(t.poll(start + 29 * MIN), None);
        assert_eq!(t.poll(start + 30 * MIN), Some(IdleEvent::Logout));
        assert_eq!(t.poll(start + 90 * MIN), None);
        assert!(!t.activity(start + 91 * MIN));
        assert_eq!(t.state(), IdleState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_warning() {
        let start = Instant::now();
        let mut t = IdleTracker::new(IdleConfig::default(), start);

        assert_eq!(t.poll(start + 28 * MIN), Some(IdleEvent::Warning));
        assert!(t.activity(start + 29 * MIN));
        assert_eq!(t.state(), IdleState::Active);
        assert_eq!(t.poll(start + 58 * MIN), None);
        assert_eq!(t.next_deadline(), Some(start + 57 * MIN));
    }

    fn recorder() -> (Arc<Mutex<Vec<IdleEvent>>>, impl Fn(IdleEvent) + Send + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |e| sink.lock().unwrap().push(e))
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_fires_logout_exactly_once() {
        let (events, on_event) = recorder();
        let watcher = IdleWatcher::spawn(IdleConfig::default(), on_event);

        sleep(120 * MIN).await;

        assert_eq!(*events.lock().unwrap(), vec![IdleEvent::Warning, IdleEvent::Logout]);
        assert!(watcher.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_activity_suppresses_logout() {
        let (events, on_event) = recorder();
        let watcher = IdleWatcher::spawn(IdleConfig::default(), on_event);

        for _ in 0..5 {
            sleep(20 * MIN).await;
            watcher.touch();
        }
        sleep(20 * MIN).await;

        assert!(events.lock().unwrap().is_empty());
        assert!(!watcher.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn registry_expires_idle_sessions() {
        let registry = SessionRegistry::new(IdleConfig::default());
        let sid = SessionId::new();
        registry.open(sid, UserId::new());

        sleep(29 * MIN).await;
        assert_eq!(registry.status(sid).unwrap().state, IdleState::Warned);
        assert_eq!(registry.touch(sid).unwrap().state, IdleState::Active);

        sleep(31 * MIN).await;
        assert_eq!(registry.touch(sid), Err(SessionError::Expired));
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.status(sid), Err(SessionError::Unknown));
    }
}
