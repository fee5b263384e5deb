//! Error types for portal I/O and page scraping
//!
//! These are the low-level failures raised by the HTTP and HTML layers.
//! [`crate::error::Error`] wraps them together with the booking-level errors.

use thiserror::Error;

/// Errors that can occur while talking to the identity provider or the portal
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected status code
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Body could not be decoded into the expected shape
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Redirect chain did not terminate
    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),
}

impl FetchError {
    /// Build a `FetchError` from a reqwest error, keeping timeouts distinct
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Whether a retry has a chance of succeeding
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) | Self::InvalidUrl(_) | Self::TooManyRedirects(_) => false,
        }
    }
}

/// Errors raised while extracting fields from the rendered login page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// The login form itself was not found
    #[error("Login form not found: {0}")]
    FormNotFound(String),

    /// A named field was absent from the form
    #[error("Expected field missing from login form: {0}")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_recoverability() {
        assert!(FetchError::Status(503).is_recoverable());
        assert!(FetchError::Status(429).is_recoverable());
        assert!(!FetchError::Status(404).is_recoverable());
        assert!(!FetchError::Status(401).is_recoverable());
    }

    #[test]
    fn test_decode_not_recoverable() {
        assert!(!FetchError::Decode("bad json".into()).is_recoverable());
        assert!(FetchError::Timeout.is_recoverable());
    }

    #[test]
    fn test_scrape_error_display() {
        let err = ScrapeError::MissingField("execution".into());
        assert_eq!(
            err.to_string(),
            "Expected field missing from login form: execution"
        );
    }
}
