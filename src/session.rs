//! Session lifetime and the one-shot expiry signal.
//!
//! Every outbound request goes through [`SessionGuard::bearer`], and every
//! HTTP rejection goes through [`SessionGuard::reject`]. A 401/403 on a
//! non-login request means the stored credential is stale: the guard fires
//! `SessionEvent::Expired` on its event channel at most once per installed
//! session and hands the caller an error whose `is_handled()` is true, so
//! the caller does not also raise a generic failure. A rejected *login*
//! attempt is ordinary bad credentials and never touches the signal.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::api::error::ApiError;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Expired,
}

pub struct SessionGuard {
    session: Mutex<Option<Session>>,
    expiry_notified: AtomicBool,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionGuard {
    /// Create the guard together with its event receiver. Exactly one
    /// top-level coordinator should consume the receiver.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let guard = Self {
            session: Mutex::new(None),
            expiry_notified: AtomicBool::new(false),
            events: tx,
        };
        (guard, rx)
    }

    /// Install a fresh session after a successful login. Re-arms the expiry
    /// signal for the new credential.
    pub fn install(&self, session: Session) {
        *self.session.lock().unwrap() = Some(session);
        self.expiry_notified.store(false, Ordering::SeqCst);
    }

    /// Explicit logout.
    pub fn clear(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub fn current(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.current().map(|s| s.user_id)
    }

    /// Attach the bearer credential, if a session exists.
    pub fn bearer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.current() {
            Some(session) => req.header("Authorization", format!("Bearer {}", session.token)),
            None => req,
        }
    }

    /// Classify an HTTP rejection into the error taxonomy.
    ///
    /// `is_login` must be true for the authentication endpoint itself: a
    /// failed login proves nothing about the stored credential and must not
    /// force a logout.
    pub fn reject(&self, status: u16, is_login: bool, detail: impl Into<String>) -> ApiError {
        if (status == 401 || status == 403) && !is_login {
            if !self.expiry_notified.swap(true, Ordering::SeqCst) {
                let _ = self.events.send(SessionEvent::Expired);
            }
            ApiError::SessionExpired
        } else {
            ApiError::Rejected(detail.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_with_session() -> (SessionGuard, mpsc::UnboundedReceiver<SessionEvent>) {
        let (guard, rx) = SessionGuard::new();
        guard.install(Session {
            user_id: "u1".into(),
            token: "tok-1".into(),
        });
        (guard, rx)
    }

    #[test]
    fn bearer_attaches_token() {
        let (guard, _rx) = guard_with_session();
        let client = reqwest::Client::new();
        let req = guard
            .bearer(client.get("http://localhost/conversations"))
            .build()
            .unwrap();
        assert_eq!(
            req.headers().get("Authorization").unwrap(),
            "Bearer tok-1"
        );
    }

    #[test]
    fn bearer_is_a_noop_without_session() {
        let (guard, _rx) = SessionGuard::new();
        let client = reqwest::Client::new();
        let req = guard
            .bearer(client.get("http://localhost/conversations"))
            .build()
            .unwrap();
        assert!(req.headers().get("Authorization").is_none());
    }

    #[test]
    fn expiry_signal_fires_exactly_once() {
        let (guard, mut rx) = guard_with_session();
        let first = guard.reject(403, false, "forbidden");
        let second = guard.reject(401, false, "unauthorized");
        assert!(first.is_handled());
        assert!(second.is_handled());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Expired);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn login_failure_never_fires_the_signal() {
        let (guard, mut rx) = guard_with_session();
        let err = guard.reject(401, true, "wrong password");
        assert!(matches!(err, ApiError::Rejected(_)));
        assert!(!err.is_handled());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reinstall_rearms_the_signal() {
        let (guard, mut rx) = guard_with_session();
        let _ = guard.reject(401, false, "stale");
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Expired);

        guard.install(Session {
            user_id: "u1".into(),
            token: "tok-2".into(),
        });
        let _ = guard.reject(403, false, "stale again");
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Expired);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn server_errors_are_plain_rejections() {
        let (guard, mut rx) = guard_with_session();
        let err = guard.reject(500, false, "boom");
        assert!(matches!(err, ApiError::Rejected(_)));
        assert!(rx.try_recv().is_err());
    }
}
