//! One booking track: the retry loop for a single time window
//!
//! ```text
//! Probing -> Allocating -> Submitting -> Success
//!    ^                         |
//!    |                         +-> Rejected (next candidate)
//!    +--- backoff <- Exhausted (pass over)
//! ```
//!
//! Each pass walks the room catalog in order. Cancellation is checked at
//! the top of every pass; there is no preemption inside a network call.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use super::prober::SlotProber;
use super::window::AvailabilityWindow;
use crate::error::{Error, Result};
use crate::jobs::{JobRegistry, RunId};
use crate::models::{RoomCatalog, SlotCandidate, SlotTime, TrackId, UserCredentials};
use crate::notifications::{BookingNotice, Notifier};
use crate::portal::{BookingOutcome, Portal};
use crate::session::SessionState;

/// Track state, used in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Probing,
    Allocating,
    Submitting,
    Success,
    Rejected,
    Exhausted,
    Cancelled,
}

impl TrackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probing => "probing",
            Self::Allocating => "allocating",
            Self::Submitting => "submitting",
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// How a track ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Booked(SlotCandidate),
    Cancelled,
}

/// Why a pass ended without a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassEnd {
    /// No candidate was bookable
    NoCandidate,
    /// Rejections exceeded the per-pass limit
    RejectionLimit,
    /// No order number could be obtained
    AllocationFailed,
}

enum PassResult {
    Booked(SlotCandidate),
    Ended(PassEnd),
}

/// Loop tuning shared by all tracks of a coordinator
#[derive(Debug, Clone)]
pub struct TrackSettings {
    /// A pass is abandoned once rejections exceed this
    pub max_rejections_per_pass: u32,
    pub backoff: BackoffPolicy,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            max_rejections_per_pass: 2,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Everything a track needs; owned so the track can run on its own task
pub struct BookingTrack {
    pub(crate) run_id: RunId,
    pub(crate) track: TrackId,
    pub(crate) time: SlotTime,
    pub(crate) window: AvailabilityWindow,
    pub(crate) user: Arc<UserCredentials>,
    pub(crate) session: SessionState,
    pub(crate) portal: Arc<dyn Portal>,
    pub(crate) catalog: Arc<RoomCatalog>,
    pub(crate) registry: JobRegistry,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) settings: TrackSettings,
}

impl BookingTrack {
    /// Run until booked, cancelled, or a run-fatal error
    ///
    /// The track's completion flag is set on every exit path. A fatal error
    /// also flags the run for cancellation so the sibling track stops.
    pub async fn run(self) -> Result<TrackOutcome> {
        let result = self.run_loop().await;

        if let Err(e) = &result {
            warn!(run_id = %self.run_id, track = %self.track, error = %e, category = e.category().as_str(), "Track aborted");
            if let Err(e) = self.registry.signal_cancel(self.run_id).await {
                debug!(run_id = %self.run_id, error = %e, "Cancel signal not recorded");
            }
        }
        if let Err(e) = self.registry.mark_complete(self.run_id, self.track).await {
            debug!(run_id = %self.run_id, track = %self.track, error = %e, "Completion not recorded");
        }

        result
    }

    async fn run_loop(&self) -> Result<TrackOutcome> {
        let prober = SlotProber::new(Arc::clone(&self.portal));
        let mut pass: u32 = 0;

        loop {
            if self.registry.is_cancelled(self.run_id).await {
                self.log_state(TrackState::Cancelled);
                return Ok(TrackOutcome::Cancelled);
            }

            pass += 1;
            match self.run_pass(&prober, pass).await? {
                PassResult::Booked(candidate) => {
                    self.log_state(TrackState::Success);
                    info!(
                        run_id = %self.run_id,
                        track = %self.track,
                        room = %candidate.id,
                        room_name = %candidate.name,
                        window = %self.window.code(),
                        pass,
                        "Slot booked"
                    );
                    self.send_notice().await;
                    return Ok(TrackOutcome::Booked(candidate));
                }
                PassResult::Ended(end) => {
                    let delay = self.settings.backoff.delay(pass);
                    debug!(
                        run_id = %self.run_id,
                        track = %self.track,
                        pass,
                        reason = ?end,
                        delay_ms = delay.as_millis() as u64,
                        state = TrackState::Exhausted.as_str(),
                        "Pass ended without booking"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn run_pass(&self, prober: &SlotProber, pass: u32) -> Result<PassResult> {
        // Counter is per pass
        let mut rejections: u32 = 0;

        for candidate in self.catalog.rooms() {
            self.log_state(TrackState::Probing);
            let probe = prober.probe(&self.session, &self.window, candidate).await?;
            if !probe.is_bookable() {
                continue;
            }

            self.log_state(TrackState::Allocating);
            let token = match self.portal.order_number(&self.session).await {
                Ok(token) => token,
                Err(Error::Allocation(reason)) => {
                    warn!(run_id = %self.run_id, track = %self.track, pass, %reason, "Order number unavailable");
                    return Ok(PassResult::Ended(PassEnd::AllocationFailed));
                }
                Err(e) => return Err(e),
            };

            self.log_state(TrackState::Submitting);
            let outcome = self
                .portal
                .submit_booking(&self.session, &token, candidate, &self.window, &self.user)
                .await?;

            match outcome {
                BookingOutcome::Accepted => return Ok(PassResult::Booked(candidate.clone())),
                BookingOutcome::Rejected | BookingOutcome::Unknown => {
                    rejections += 1;
                    warn!(
                        run_id = %self.run_id,
                        track = %self.track,
                        room = %candidate.id,
                        outcome = outcome.as_str(),
                        rejections,
                        state = TrackState::Rejected.as_str(),
                        "Booking not accepted"
                    );
                    if rejections > self.settings.max_rejections_per_pass {
                        return Ok(PassResult::Ended(PassEnd::RejectionLimit));
                    }
                }
            }
        }

        Ok(PassResult::Ended(PassEnd::NoCandidate))
    }

    async fn send_notice(&self) {
        let notice = BookingNotice::new(
            self.user.phone_number.clone(),
            self.user.user_name.clone(),
            self.user.sport_date,
            self.time.to_string(),
        );
        if let Err(e) = self.notifier.notify(&notice).await {
            warn!(run_id = %self.run_id, track = %self.track, notifier = self.notifier.name(), error = %e, "Notification failed, booking stands");
        }
    }

    fn log_state(&self, state: TrackState) {
        debug!(run_id = %self.run_id, track = %self.track, state = state.as_str(), "Track state");
    }
}
