//! Unified error handling for the courtside crate
//!
//! Domain-specific failures (fetching, scraping, the password transform) are
//! wrapped into a single [`Error`] enum. The variants map onto the failure
//! taxonomy the reservation engine reasons about:
//!
//! - [`ErrorCategory::Scrape`] - the login page changed shape; fatal to the run
//! - [`ErrorCategory::Transport`] - network/IO failure; fatal to the attempt
//! - [`ErrorCategory::Rejection`] - the portal declined a booking; retried
//! - [`ErrorCategory::Allocation`] - no order number could be obtained; the pass is aborted
//!
//! # Usage
//!
//! ```rust,ignore
//! use courtside::error::{Error, ErrorCategory};
//!
//! fn handle(err: Error) {
//!     if err.category() == ErrorCategory::Rejection {
//!         // absorbed by the track loop
//!     } else if !err.is_recoverable() {
//!         eprintln!("run aborted: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::crypto::CryptoError;
pub use crate::utils::error::{FetchError, ScrapeError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Expected markup missing from a scraped page
    Scrape,
    /// Network, status or decode failure on a portal call
    Transport,
    /// Booking explicitly declined by the portal
    Rejection,
    /// Order number could not be obtained
    Allocation,
    /// Credentials were not accepted
    Login,
    /// Configuration and input validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in log fields and API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Transport => "transport",
            Self::Rejection => "rejection",
            Self::Allocation => "allocation",
            Self::Login => "login",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the courtside crate
#[derive(Error, Debug)]
pub enum Error {
    /// Login page did not contain an expected field
    #[error("Scrape failure: {0}")]
    Scrape(#[from] ScrapeError),

    /// Transport-level failure talking to the identity provider or portal
    #[error("Transport failure: {0}")]
    Fetch(#[from] FetchError),

    /// Booking declined by the portal
    #[error("Booking rejected: {0}")]
    Rejected(String),

    /// Order number fetch failed
    #[error("Order allocation failed: {0}")]
    Allocation(String),

    /// Login handshake completed without producing a usable session
    #[error("Login failed: {0}")]
    Login(String),

    /// Password transform failed
    #[error("Password transform failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration or input validation errors
    #[error("Config error: {0}")]
    Config(String),

    /// Run was cancelled by the operator
    #[error("Run cancelled")]
    Cancelled,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a login error
    pub fn login(msg: impl Into<String>) -> Self {
        Self::Login(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Scrape(_) => ErrorCategory::Scrape,
            Self::Fetch(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Transport,
            Self::Rejected(_) => ErrorCategory::Rejection,
            Self::Allocation(_) => ErrorCategory::Allocation,
            Self::Login(_) | Self::Crypto(_) => ErrorCategory::Login,
            Self::Config(_) => ErrorCategory::Config,
            Self::Cancelled => ErrorCategory::Other,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Rejected(_) => true,
            Self::Io(_) => true,
            Self::Allocation(_) => true,
            Self::Scrape(_)
            | Self::Login(_)
            | Self::Crypto(_)
            | Self::Config(_)
            | Self::Cancelled
            | Self::Json(_) => false,
        }
    }

    /// Whether this error must abort the whole run
    ///
    /// Rejections and allocation failures only end the current attempt.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::Allocation(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(FetchError::from_reqwest(err))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
