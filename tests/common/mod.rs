//! Common test utilities
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use courtside::booking::{AvailabilityWindow, CoordinatorSettings, ReservationCoordinator};
use courtside::error::{Error, Result};
use courtside::jobs::JobRegistry;
use courtside::models::{OrderToken, RoomCatalog, SlotCandidate, UserCredentials};
use courtside::notifications::{BookingNotice, Notifier, NotifyError, NotifyResult};
use courtside::portal::response::BOOKABLE_LABEL;
use courtside::portal::{BookingOutcome, Portal, RoomEntry, TimeSlotEntry};
use courtside::session::{Authenticator, SessionCookies, SessionState};
use courtside::utils::error::FetchError;

/// Login page with every hidden input the handshake needs
pub fn login_page_html() -> String {
    login_page_with(r#"<input type="hidden" id="pwdEncryptSalt" value="rjBFAaHsNkKAhpoi" />"#)
}

/// Login page with the four anti-forgery inputs plus `extra`
pub fn login_page_with(extra: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>统一身份认证</title></head>
<body>
  <form id="pwdFromId" method="post" action="/authserver/login">
    <input type="text" name="username" />
    <input type="password" name="passwordText" />
    <input type="hidden" name="lt" value="LT-1" />
    <input type="hidden" name="dllt" value="generalLogin" />
    <input type="hidden" name="execution" value="e1s1" />
    <input type="hidden" name="_eventId" value="submit" />
    {extra}
  </form>
</body></html>"#
    )
}

/// Credentials for 2024-09-17 at `first`, with an optional second time
pub fn user(first: &str, second: &str) -> UserCredentials {
    UserCredentials::from_form(
        "2210274049",
        "Alice",
        "secret",
        "13800000000",
        "2024-09-17",
        first,
        second,
        true,
    )
    .unwrap()
}

pub fn catalog(ids: &[&str]) -> RoomCatalog {
    RoomCatalog::new(
        ids.iter()
            .map(|id| SlotCandidate {
                id: id.to_string(),
                name: format!("Court {id}"),
            })
            .collect(),
    )
}

pub fn session() -> SessionState {
    SessionState::new(SessionCookies::new("weu-1", "ST-1"))
}

// ============================================================================
// Scripted portal
// ============================================================================

#[derive(Default)]
struct Script {
    /// Consumed one per time-list call, then `time_open_default`
    time_open: VecDeque<bool>,
    time_open_default: bool,
    open_rooms: Vec<String>,
    /// `Err` answers with an allocation failure
    orders: VecDeque<std::result::Result<String, String>>,
    /// Consumed one per submission, then `Accepted`
    outcomes: VecDeque<BookingOutcome>,
    /// Window codes that never open
    closed_windows: Vec<String>,
    /// Window code whose time list fails with HTTP 500
    failing_window: Option<String>,
}

/// In-memory portal with call counters
#[derive(Default)]
pub struct ScriptedPortal {
    script: Mutex<Script>,
    pub time_list_calls: AtomicUsize,
    pub opening_rooms_calls: AtomicUsize,
    pub order_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    probed_windows: Mutex<Vec<String>>,
    submissions: Mutex<Vec<(String, String)>>,
}

impl ScriptedPortal {
    /// Every window open, no rooms open
    pub fn new() -> Self {
        let portal = Self::default();
        portal.script.lock().unwrap().time_open_default = true;
        portal
    }

    pub fn with_time_sequence(self, sequence: &[bool]) -> Self {
        self.script.lock().unwrap().time_open.extend(sequence.iter().copied());
        self
    }

    pub fn with_windows_closed(self) -> Self {
        self.script.lock().unwrap().time_open_default = false;
        self
    }

    pub fn with_open_rooms(self, ids: &[&str]) -> Self {
        self.script.lock().unwrap().open_rooms = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_outcomes(self, outcomes: &[BookingOutcome]) -> Self {
        self.script.lock().unwrap().outcomes.extend(outcomes.iter().copied());
        self
    }

    pub fn with_order_failure(self, reason: &str) -> Self {
        self.script.lock().unwrap().orders.push_back(Err(reason.to_string()));
        self
    }

    pub fn with_closed_window(self, code: &str) -> Self {
        self.script.lock().unwrap().closed_windows.push(code.to_string());
        self
    }

    pub fn with_failing_window(self, code: &str) -> Self {
        self.script.lock().unwrap().failing_window = Some(code.to_string());
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn time_lists(&self) -> usize {
        Self::count(&self.time_list_calls)
    }

    pub fn room_lists(&self) -> usize {
        Self::count(&self.opening_rooms_calls)
    }

    pub fn orders(&self) -> usize {
        Self::count(&self.order_calls)
    }

    pub fn submits(&self) -> usize {
        Self::count(&self.submit_calls)
    }

    pub fn probed_windows(&self) -> Vec<String> {
        self.probed_windows.lock().unwrap().clone()
    }

    /// `(room id, window code)` of every submission, in order
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Portal for ScriptedPortal {
    async fn time_list(
        &self,
        _session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<Vec<TimeSlotEntry>> {
        self.time_list_calls.fetch_add(1, Ordering::SeqCst);
        let code = window.code();
        self.probed_windows.lock().unwrap().push(code.clone());

        let mut script = self.script.lock().unwrap();
        if script.failing_window.as_deref() == Some(code.as_str()) {
            return Err(Error::Fetch(FetchError::Status(500)));
        }
        let open = if script.closed_windows.contains(&code) {
            false
        } else {
            script.time_open.pop_front().unwrap_or(script.time_open_default)
        };

        Ok(vec![TimeSlotEntry {
            code,
            text: if open { BOOKABLE_LABEL.to_string() } else { "已约满".to_string() },
            disabled: !open,
            ..Default::default()
        }])
    }

    async fn opening_rooms(
        &self,
        _session: &SessionState,
        _window: &AvailabilityWindow,
    ) -> Result<Vec<RoomEntry>> {
        self.opening_rooms_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap();
        Ok(script
            .open_rooms
            .iter()
            .map(|id| RoomEntry {
                wid: id.clone(),
                text: BOOKABLE_LABEL.to_string(),
                ..Default::default()
            })
            .collect())
    }

    async fn order_number(&self, _session: &SessionState) -> Result<OrderToken> {
        let n = self.order_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().orders.pop_front() {
            Some(Err(reason)) => Err(Error::Allocation(reason)),
            Some(Ok(token)) => Ok(OrderToken(token)),
            None => Ok(OrderToken(format!("DH{n:04}"))),
        }
    }

    async fn submit_booking(
        &self,
        _session: &SessionState,
        _token: &OrderToken,
        candidate: &SlotCandidate,
        window: &AvailabilityWindow,
        _user: &UserCredentials,
    ) -> Result<BookingOutcome> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .push((candidate.id.clone(), window.code()));
        Ok(self
            .script
            .lock()
            .unwrap()
            .outcomes
            .pop_front()
            .unwrap_or(BookingOutcome::Accepted))
    }
}

// ============================================================================
// Notifier and authenticator doubles
// ============================================================================

/// Notifier that remembers every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<BookingNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Records the notice, then reports a delivery failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn notices(&self) -> Vec<BookingNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notice: &BookingNotice) -> NotifyResult<()> {
        self.notices.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(NotifyError::Delivery("relay down".into()));
        }
        Ok(())
    }
}

/// Authenticator handing out a fixed session
#[derive(Default)]
pub struct StaticAuthenticator {
    pub calls: AtomicUsize,
    reject: bool,
}

impl StaticAuthenticator {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _user_id: &str, _password: &str) -> Result<SessionState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(Error::login("credentials not accepted (final status 200)"));
        }
        Ok(session())
    }
}

/// Coordinator over the doubles with default settings
pub fn coordinator(
    portal: Arc<ScriptedPortal>,
    authenticator: Arc<StaticAuthenticator>,
    notifier: Arc<RecordingNotifier>,
    rooms: RoomCatalog,
) -> ReservationCoordinator {
    ReservationCoordinator::new(
        portal,
        authenticator,
        notifier,
        JobRegistry::new(),
        rooms,
        CoordinatorSettings::default(),
    )
}
