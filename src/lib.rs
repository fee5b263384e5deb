//! courtside - sports-venue slot reservation
//!
//! Logs into the campus identity provider, then races booking attempts for
//! up to two hour windows on the venue portal until each is booked or the
//! run is cancelled.
//!
//! # Architecture
//!
//! - [`crypto`] - password transform required by the login page
//! - [`session`] - login handshake and the shared session cookie cell
//! - [`portal`] - portal endpoints, wire types and the HTTP client
//! - [`booking`] - availability probing, booking tracks and the coordinator
//! - [`jobs`] - registry of live runs and their completion flags
//! - [`scheduler`] - daily start trigger
//! - [`notifications`] - booking confirmations
//! - [`server`] - JSON API for operators
//! - [`config`] - configuration and settings
//! - [`models`] - core data structures
//!
//! # Example
//!
//! ```no_run
//! use courtside::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let acquirer = SessionAcquirer::new(&config.portal, Arc::new(CasAesCipher::new()))?;
//!     let session = acquirer.acquire("2210274049", "password").await?;
//!     println!("{:?}", session.snapshot());
//!     Ok(())
//! }
//! ```

pub mod booking;
pub mod config;
pub mod crypto;
pub mod error;
pub mod jobs;
pub mod models;
pub mod notifications;
pub mod portal;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::booking::{
        AvailabilityWindow, BackoffPolicy, CoordinatorSettings, ReservationCoordinator,
        RunReport, TrackSettings,
    };
    pub use crate::config::Config;
    pub use crate::crypto::{CasAesCipher, PasswordCipher};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::jobs::{JobRecord, JobRegistry, RunId};
    pub use crate::models::{RoomCatalog, SlotCandidate, SlotTime, TrackId, UserCredentials};
    pub use crate::notifications::{LogNotifier, Notifier};
    pub use crate::portal::{Portal, PortalClient};
    pub use crate::session::{Authenticator, SessionAcquirer, SessionState};
}

pub use models::{SlotCandidate, TrackId, UserCredentials};
