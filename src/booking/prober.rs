//! Availability checks for one candidate room
//!
//! The time list is checked first. Only when the hour window itself is open
//! is the room list fetched for the specific candidate.

use std::sync::Arc;
use tracing::debug;

use super::window::AvailabilityWindow;
use crate::error::Result;
use crate::models::SlotCandidate;
use crate::portal::response::{is_room_open, is_time_slot_open};
use crate::portal::Portal;
use crate::session::SessionState;

/// Result of probing one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Window and room are both open
    Bookable,
    /// The hour window is closed; the room list was not consulted
    WindowClosed,
    /// The window is open but this room is not
    RoomTaken,
}

impl ProbeOutcome {
    pub fn is_bookable(&self) -> bool {
        matches!(self, Self::Bookable)
    }
}

/// Runs the two availability sub-checks against the portal
#[derive(Clone)]
pub struct SlotProber {
    portal: Arc<dyn Portal>,
}

impl SlotProber {
    pub fn new(portal: Arc<dyn Portal>) -> Self {
        Self { portal }
    }

    pub async fn time_slot_open(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<bool> {
        let entries = self.portal.time_list(session, window).await?;
        Ok(is_time_slot_open(&entries, window))
    }

    pub async fn room_open(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
        room_id: &str,
    ) -> Result<bool> {
        let rows = self.portal.opening_rooms(session, window).await?;
        Ok(is_room_open(&rows, room_id))
    }

    /// Probe `candidate`, short-circuiting when the window is closed
    pub async fn probe(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
        candidate: &SlotCandidate,
    ) -> Result<ProbeOutcome> {
        if !self.time_slot_open(session, window).await? {
            debug!(room = %candidate.id, window = %window.code(), "Window closed");
            return Ok(ProbeOutcome::WindowClosed);
        }

        if !self.room_open(session, window, &candidate.id).await? {
            debug!(room = %candidate.id, window = %window.code(), "Room taken");
            return Ok(ProbeOutcome::RoomTaken);
        }

        Ok(ProbeOutcome::Bookable)
    }
}
