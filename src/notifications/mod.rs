//! Booking confirmations
//!
//! A successful track calls its [`Notifier`] exactly once. Delivery failures
//! are logged by the caller and never undo the booking.
//!
//! - [`LogNotifier`] writes the confirmation to the log (default)
//! - [`webhook::WebhookNotifier`] POSTs it as JSON to an SMS relay

pub mod webhook;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use webhook::{WebhookConfig, WebhookNotifier};

/// Result type for notifier operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur while delivering a confirmation
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No phone number on file for the user
    #[error("Phone number is empty for user {0}")]
    MissingPhone(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid notifier configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Relay answered with an error
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// One booked slot to announce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotice {
    pub phone: String,
    pub name: String,
    pub date: NaiveDate,
    /// Requested start time, `HH:MM`
    pub time: String,
}

impl BookingNotice {
    pub fn new(
        phone: impl Into<String>,
        name: impl Into<String>,
        date: NaiveDate,
        time: impl Into<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            name: name.into(),
            date,
            time: time.into(),
        }
    }

    /// Template parameters the SMS relay fills in
    pub fn template_params(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "date": self.date.format("%Y-%m-%d").to_string(),
            "time": self.time,
        })
    }

    fn require_phone(&self) -> NotifyResult<()> {
        if self.phone.trim().is_empty() {
            return Err(NotifyError::MissingPhone(self.name.clone()));
        }
        Ok(())
    }
}

/// Delivers booking confirmations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn notify(&self, notice: &BookingNotice) -> NotifyResult<()>;
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notice: &BookingNotice) -> NotifyResult<()> {
        notice.require_phone()?;
        info!(
            name = %notice.name,
            date = %notice.date,
            time = %notice.time,
            "Booking confirmed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(phone: &str) -> BookingNotice {
        BookingNotice::new(
            phone,
            "Alice",
            NaiveDate::from_ymd_opt(2024, 9, 17).unwrap(),
            "20:00",
        )
    }

    #[test]
    fn test_template_params() {
        let params = notice("13800000000").template_params();
        assert_eq!(params["name"], "Alice");
        assert_eq!(params["date"], "2024-09-17");
        assert_eq!(params["time"], "20:00");
    }

    #[tokio::test]
    async fn test_log_notifier() {
        assert!(LogNotifier.notify(&notice("13800000000")).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_phone_is_error() {
        let result = LogNotifier.notify(&notice("  ")).await;
        assert!(matches!(result, Err(NotifyError::MissingPhone(name)) if name == "Alice"));
    }
}
