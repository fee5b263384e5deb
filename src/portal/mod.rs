//! Booking portal transport
//!
//! [`Portal`] is the seam between the reservation engine and HTTP. The
//! production implementation is [`PortalClient`]; tests drive the engine
//! with scripted implementations.

pub mod client;
pub mod endpoints;
pub mod headers;
pub mod response;

use async_trait::async_trait;

use crate::booking::window::AvailabilityWindow;
use crate::error::Result;
use crate::models::{OrderToken, SlotCandidate, UserCredentials};
use crate::session::SessionState;

pub use client::PortalClient;
pub use endpoints::Endpoints;
pub use response::{classify_booking_response, BookingOutcome, RoomEntry, TimeSlotEntry};

/// The four portal calls a booking track makes
#[async_trait]
pub trait Portal: Send + Sync {
    /// Time-list entries for the window's date
    ///
    /// May rotate the session cookie held in `session`.
    async fn time_list(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<Vec<TimeSlotEntry>>;

    /// Room rows for the window
    async fn opening_rooms(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<Vec<RoomEntry>>;

    /// Fresh one-time order number
    ///
    /// Fails with `Error::Allocation` when none can be obtained.
    async fn order_number(&self, session: &SessionState) -> Result<OrderToken>;

    /// Submit one booking and classify the response
    async fn submit_booking(
        &self,
        session: &SessionState,
        token: &OrderToken,
        candidate: &SlotCandidate,
        window: &AvailabilityWindow,
        user: &UserCredentials,
    ) -> Result<BookingOutcome>;
}
