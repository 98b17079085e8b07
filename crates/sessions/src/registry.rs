//! Client session registry.
//!
//! Tracks every client id the transport has announced, whether it is still
//! connected, and when it was last heard from.  Records are only dropped by
//! [`SessionRegistry::cleanup_disconnected`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use cb_domain::ClientId;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Disconnected,
}

/// A single client session.  `last_disconnect_at` is `Some` exactly when
/// `state` is `Disconnected`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSession {
    pub client_id: ClientId,
    pub state: SessionState,
    pub last_activity_at: DateTime<Utc>,
    pub last_disconnect_at: Option<DateTime<Utc>>,
}

impl ClientSession {
    fn active(client_id: ClientId, now: DateTime<Utc>) -> Self {
        Self {
            client_id,
            state: SessionState::Active,
            last_activity_at: now,
            last_disconnect_at: None,
        }
    }

    fn activate(&mut self, now: DateTime<Utc>) -> bool {
        let reactivated = self.state == SessionState::Disconnected;
        self.state = SessionState::Active;
        self.last_activity_at = now;
        self.last_disconnect_at = None;
        reactivated
    }
}

/// Point-in-time view of a session, as used when annotating notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Connected and recently active.
    Active,
    /// Connected but silent for longer than the staleness window.
    Stale { idle: Duration },
    /// Disconnected at `since`.
    Disconnected { since: DateTime<Utc> },
    /// Never registered, or already purged.
    Absent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub active: usize,
    pub disconnected: usize,
    /// Lifetime transitions into the active state.
    pub total_registered: u64,
    /// Lifetime transitions into the disconnected state.
    pub total_disconnected: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Inner {
    sessions: HashMap<ClientId, ClientSession>,
    total_registered: u64,
    total_disconnected: u64,
}

impl Inner {
    fn activate(&mut self, client_id: &ClientId, now: DateTime<Utc>) -> bool {
        let transitioned = match self.sessions.get_mut(client_id) {
            Some(session) => session.activate(now),
            None => {
                self.sessions
                    .insert(client_id.clone(), ClientSession::active(client_id.clone(), now));
                true
            }
        };
        if transitioned {
            self.total_registered += 1;
        }
        transitioned
    }
}

/// Authoritative store of client session state.
///
/// Every method takes the lock once, so each check-and-set is atomic with
/// respect to concurrent transport events.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a client active (handshake).  Re-registering refreshes the
    /// activity timestamp and clears any disconnect marker.
    pub fn register(&self, client_id: &ClientId) {
        let created = self.inner.lock().activate(client_id, Utc::now());
        if created {
            tracing::info!(client_id = %client_id, "client session registered");
        } else {
            tracing::debug!(client_id = %client_id, "client session refreshed");
        }
    }

    /// Record subscribe/heartbeat activity.  Unknown and disconnected ids
    /// become active.
    pub fn touch(&self, client_id: &ClientId) {
        let reactivated = self.inner.lock().activate(client_id, Utc::now());
        if reactivated {
            tracing::info!(client_id = %client_id, "client session (re)activated by activity");
        }
    }

    /// Transition to disconnected.  Returns `true` only for the call that
    /// performed the transition.
    pub fn disconnect(&self, client_id: &ClientId) -> bool {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let transitioned = match inner.sessions.get_mut(client_id) {
            Some(session) if session.state == SessionState::Active => {
                session.state = SessionState::Disconnected;
                session.last_disconnect_at = Some(now);
                true
            }
            _ => false,
        };
        if transitioned {
            inner.total_disconnected += 1;
        }
        drop(inner);

        if transitioned {
            tracing::info!(client_id = %client_id, "client session disconnected");
        }
        transitioned
    }

    pub fn is_active(&self, client_id: &ClientId) -> bool {
        self.state_of(client_id) == Some(SessionState::Active)
    }

    pub fn is_disconnected(&self, client_id: &ClientId) -> bool {
        self.state_of(client_id) == Some(SessionState::Disconnected)
    }

    pub fn get(&self, client_id: &ClientId) -> Option<ClientSession> {
        self.inner.lock().sessions.get(client_id).cloned()
    }

    /// Classify a session at `now`, treating active sessions idle for longer
    /// than `stale_after` as stale.
    pub fn status(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> SessionStatus {
        let inner = self.inner.lock();
        let Some(session) = inner.sessions.get(client_id) else {
            return SessionStatus::Absent;
        };
        match (session.state, session.last_disconnect_at) {
            (SessionState::Disconnected, Some(since)) => SessionStatus::Disconnected { since },
            (SessionState::Disconnected, None) => SessionStatus::Disconnected {
                since: session.last_activity_at,
            },
            (SessionState::Active, _) => {
                let idle = now - session.last_activity_at;
                if idle > stale_after {
                    SessionStatus::Stale { idle }
                } else {
                    SessionStatus::Active
                }
            }
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        let disconnected = inner
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Disconnected)
            .count();
        RegistryStats {
            active: inner.sessions.len() - disconnected,
            disconnected,
            total_registered: inner.total_registered,
            total_disconnected: inner.total_disconnected,
        }
    }

    /// Purge disconnected records.  Lifetime counters are untouched.
    pub fn cleanup_disconnected(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, s| s.state != SessionState::Disconnected);
        let removed = before - inner.sessions.len();
        drop(inner);

        if removed > 0 {
            tracing::info!(removed, "purged disconnected client sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state_of(&self, client_id: &ClientId) -> Option<SessionState> {
        self.inner.lock().sessions.get(client_id).map(|s| s.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ClientId {
        ClientId::from(s)
    }

    #[test]
    fn registered_session_is_active() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        assert!(reg.is_active(&id("a")));
        assert!(!reg.is_disconnected(&id("a")));
    }

    #[test]
    fn unknown_id_is_neither_active_nor_disconnected() {
        let reg = SessionRegistry::new();
        assert!(!reg.is_active(&id("ghost")));
        assert!(!reg.is_disconnected(&id("ghost")));
        assert!(!reg.disconnect(&id("ghost")));
    }

    #[test]
    fn disconnect_transitions_once() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        assert!(reg.disconnect(&id("a")));
        assert!(!reg.disconnect(&id("a")));
        assert!(reg.is_disconnected(&id("a")));
        assert!(!reg.is_active(&id("a")));
        assert_eq!(reg.stats().total_disconnected, 1);
    }

    #[test]
    fn disconnect_marker_tracks_state() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        assert!(reg.get(&id("a")).unwrap().last_disconnect_at.is_none());
        reg.disconnect(&id("a"));
        assert!(reg.get(&id("a")).unwrap().last_disconnect_at.is_some());
        reg.touch(&id("a"));
        let session = reg.get(&id("a")).unwrap();
        assert_eq!(session.state, SessionState::Active);
        assert!(session.last_disconnect_at.is_none());
    }

    #[test]
    fn touch_creates_unknown_session() {
        let reg = SessionRegistry::new();
        reg.touch(&id("late"));
        assert!(reg.is_active(&id("late")));
        assert_eq!(reg.stats().total_registered, 1);
    }

    #[test]
    fn re_register_only_counts_transitions() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        reg.register(&id("a"));
        reg.touch(&id("a"));
        assert_eq!(reg.stats().total_registered, 1);
        reg.disconnect(&id("a"));
        reg.register(&id("a"));
        assert_eq!(reg.stats().total_registered, 2);
    }

    #[test]
    fn cleanup_removes_only_disconnected_and_keeps_counters() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        reg.register(&id("b"));
        reg.register(&id("c"));
        reg.disconnect(&id("b"));
        reg.disconnect(&id("c"));

        assert_eq!(reg.cleanup_disconnected(), 2);
        assert_eq!(reg.cleanup_disconnected(), 0);

        let stats = reg.stats();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.disconnected, 0);
        assert_eq!(stats.total_registered, 3);
        assert_eq!(stats.total_disconnected, 2);
        assert!(reg.get(&id("b")).is_none());
    }

    #[test]
    fn status_reports_stale_and_disconnected() {
        let reg = SessionRegistry::new();
        reg.register(&id("a"));
        let window = Duration::seconds(300);

        assert_eq!(reg.status(&id("a"), Utc::now(), window), SessionStatus::Active);
        let later = Utc::now() + Duration::seconds(600);
        assert!(matches!(
            reg.status(&id("a"), later, window),
            SessionStatus::Stale { .. }
        ));

        reg.disconnect(&id("a"));
        assert!(matches!(
            reg.status(&id("a"), Utc::now(), window),
            SessionStatus::Disconnected { .. }
        ));
        assert_eq!(reg.status(&id("zz"), Utc::now(), window), SessionStatus::Absent);
    }

    #[test]
    fn concurrent_disconnects_transition_exactly_once() {
        let reg = std::sync::Arc::new(SessionRegistry::new());
        reg.register(&id("a"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || reg.disconnect(&id("a")))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
