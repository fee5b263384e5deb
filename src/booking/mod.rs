//! Reservation engine
//!
//! - [`window`] renders dates and hour windows in the portal's format
//! - [`prober`] decides whether a room is bookable
//! - [`track`] is the per-window retry loop
//! - [`coordinator`] runs the tracks of a run and retires its job record
//! - [`backoff`] paces passes

pub mod backoff;
pub mod coordinator;
pub mod prober;
pub mod track;
pub mod window;

pub use backoff::BackoffPolicy;
pub use coordinator::{CoordinatorSettings, ReservationCoordinator, RunReport, TrackReport};
pub use prober::{ProbeOutcome, SlotProber};
pub use track::{TrackOutcome, TrackSettings, TrackState};
pub use window::AvailabilityWindow;
