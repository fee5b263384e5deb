//! Authenticated session against the booking portal
//!
//! - [`login`] drives the multi-hop login handshake ([`SessionAcquirer`])
//! - [`form`] extracts the hidden login tokens from the rendered page
//! - [`cookies`] holds cookie names and the per-hop rotation policy
//!
//! The resulting [`SessionState`] is shared by the booking tracks of one
//! run. The cookie pair sits in a single mutex-guarded cell: readers take a
//! snapshot, rotations replace the session value in place.

pub mod cookies;
pub mod form;
pub mod login;

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use form::LoginForm;
pub use login::SessionAcquirer;

use cookies::{AUTH_COOKIE, LANG_COOKIE, SESSION_COOKIE};
use crate::error::Result;

/// Produces an authenticated session for a user
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, user_id: &str, password: &str) -> Result<SessionState>;
}

#[async_trait]
impl Authenticator for SessionAcquirer {
    async fn authenticate(&self, user_id: &str, password: &str) -> Result<SessionState> {
        self.acquire(user_id, password).await
    }
}

/// The two credential cookies for the portal
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SessionCookies {
    /// Rotating `_WEU` value
    pub session: String,
    /// `MOD_AUTH_CAS` value
    pub auth: String,
}

impl SessionCookies {
    pub fn new(session: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            auth: auth.into(),
        }
    }

    /// `Cookie` header carrying only the credential pair
    pub fn credential_header(&self) -> String {
        format!(
            "{SESSION_COOKIE}={}; {AUTH_COOKIE}={}",
            self.session, self.auth
        )
    }

    /// `Cookie` header for portal API calls
    pub fn api_header(&self) -> String {
        format!(
            "{}; {}={}",
            self.credential_header(),
            LANG_COOKIE.0,
            LANG_COOKIE.1
        )
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("session_len", &self.session.len())
            .field("auth_len", &self.auth.len())
            .finish()
    }
}

/// Shared, mutually exclusive cookie cell for one run
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    cell: Arc<Mutex<SessionCookies>>,
}

impl SessionState {
    pub fn new(cookies: SessionCookies) -> Self {
        Self {
            cell: Arc::new(Mutex::new(cookies)),
        }
    }

    // A panic mid-update leaves only a fully written String behind
    fn lock(&self) -> MutexGuard<'_, SessionCookies> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current cookie pair
    pub fn snapshot(&self) -> SessionCookies {
        self.lock().clone()
    }

    /// Replace the session cookie; returns whether the value changed
    pub fn rotate_session(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        let mut cookies = self.lock();
        if cookies.session == value {
            return false;
        }
        cookies.session = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_headers() {
        let cookies = SessionCookies::new("weu1", "cas1");
        assert_eq!(cookies.credential_header(), "_WEU=weu1; MOD_AUTH_CAS=cas1");
        assert_eq!(
            cookies.api_header(),
            "_WEU=weu1; MOD_AUTH_CAS=cas1; EMAP_LANG=zh"
        );
    }

    #[test]
    fn test_debug_redacts_values() {
        let cookies = SessionCookies::new("secret-weu", "secret-cas");
        let debug = format!("{cookies:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_rotation_visible_to_clones() {
        let state = SessionState::new(SessionCookies::new("a", "cas"));
        let other = state.clone();

        assert!(other.rotate_session("b"));
        assert!(!other.rotate_session("b"));
        assert_eq!(state.snapshot(), SessionCookies::new("b", "cas"));
    }

    #[test]
    fn test_concurrent_rotation() {
        let state = SessionState::new(SessionCookies::new("start", "cas"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        state.rotate_session(format!("t{i}-{j}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot.auth, "cas");
        assert!(snapshot.session.ends_with("-99"));
    }
}
