//! HTTP implementation of [`Portal`]
//!
//! Every call is a form-encoded POST carrying the run's cookie pair in an
//! explicit `Cookie` header; the client keeps no cookie store of its own.
//! Transport failures are retried only when `transport_retries > 0`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::endpoints::Endpoints;
use super::headers::build_api_headers;
use super::response::{
    classify_booking_response, BookingOutcome, OpeningRoomResponse, OrderNumberResponse,
    RoomEntry, TimeSlotEntry,
};
use super::Portal;
use crate::booking::window::AvailabilityWindow;
use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::models::{OrderToken, SlotCandidate, UserCredentials};
use crate::session::cookies::{extract_rotated_cookie, Hop};
use crate::session::SessionState;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_transport_retry, RetryConfig};

/// Fixed categorical values the portal requires
const CAMPUS: &str = "1";
const SPORT_CODE: &str = "001";
const VENUE_CODE: &str = "001";
const BOOKING_KIND: &str = "1.0";

/// Portal client over reqwest
pub struct PortalClient {
    client: Client,
    endpoints: Endpoints,
    api_headers: HeaderMap,
    retry: RetryConfig,
}

impl PortalClient {
    /// Create a client from portal configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if the base URLs are invalid or the HTTP client
    /// cannot be built
    pub fn new(config: &PortalConfig, transport_retries: u32) -> Result<Self> {
        Self::with_endpoints(
            Endpoints::from_config(config)?,
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
            RetryConfig::new(transport_retries),
        )
    }

    pub fn with_endpoints(
        endpoints: Endpoints,
        user_agent: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(FetchError::from_reqwest)?;
        let api_headers = build_api_headers(user_agent, &endpoints.referer()?);

        Ok(Self {
            client,
            endpoints,
            api_headers,
            retry,
        })
    }

    async fn post_form(
        &self,
        session: &SessionState,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<Response> {
        with_transport_retry(&self.retry, move || async move {
            let response = self
                .client
                .post(url.clone())
                .headers(self.api_headers.clone())
                .header(COOKIE, session.snapshot().api_header())
                .form(form)
                .send()
                .await
                .map_err(FetchError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()).into());
            }
            Ok(response)
        })
        .await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await.map_err(FetchError::from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("{e}: {}", truncate(&body, 120))).into())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Portal for PortalClient {
    #[instrument(skip_all, fields(window = %window.code()))]
    async fn time_list(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<Vec<TimeSlotEntry>> {
        let date = window.date_string();
        let form = [
            ("XQ", CAMPUS),
            ("YYRQ", date.as_str()),
            ("XMDM", SPORT_CODE),
            ("YYLX", BOOKING_KIND),
        ];
        let response = self
            .post_form(session, &self.endpoints.time_list()?, &form)
            .await?;

        if let Some(rotated) = extract_rotated_cookie(response.headers(), Hop::TimeListProbe) {
            if session.rotate_session(rotated) {
                debug!("Session cookie rotated by time list");
            }
        }

        Self::read_json(response).await
    }

    #[instrument(skip_all, fields(window = %window.code()))]
    async fn opening_rooms(
        &self,
        session: &SessionState,
        window: &AvailabilityWindow,
    ) -> Result<Vec<RoomEntry>> {
        let date = window.date_string();
        let start = window.start_clock();
        let end = window.end_clock();
        let form = [
            ("XMDM", SPORT_CODE),
            ("YYRQ", date.as_str()),
            ("YYLX", BOOKING_KIND),
            ("KSSJ", start.as_str()),
            ("JSSJ", end.as_str()),
            ("XQDM", CAMPUS),
        ];
        let response = self
            .post_form(session, &self.endpoints.opening_rooms()?, &form)
            .await?;

        let parsed: OpeningRoomResponse = Self::read_json(response).await?;
        Ok(parsed.into_rows())
    }

    async fn order_number(&self, session: &SessionState) -> Result<OrderToken> {
        let url = self
            .endpoints
            .order_number()
            .map_err(|e| Error::Allocation(e.to_string()))?;

        let response = self
            .post_form(session, &url, &[])
            .await
            .map_err(|e| Error::Allocation(e.to_string()))?;
        let parsed: OrderNumberResponse = Self::read_json(response)
            .await
            .map_err(|e| Error::Allocation(e.to_string()))?;

        if parsed.dhid.trim().is_empty() {
            return Err(Error::Allocation("empty order number".into()));
        }
        Ok(OrderToken(parsed.dhid))
    }

    #[instrument(skip_all, fields(room = %candidate.id, window = %window.code()))]
    async fn submit_booking(
        &self,
        session: &SessionState,
        token: &OrderToken,
        candidate: &SlotCandidate,
        window: &AvailabilityWindow,
        user: &UserCredentials,
    ) -> Result<BookingOutcome> {
        let date = window.date_string();
        let code = window.code();
        let start = window.start_stamp();
        let end = window.end_stamp();
        let form = [
            ("DHID", token.as_str()),
            ("YYRGH", user.user_id.as_str()),
            ("CYRS", ""),
            ("YYRXM", user.user_name.as_str()),
            ("LXFS", user.phone_number.as_str()),
            ("CGDM", VENUE_CODE),
            ("CDWID", candidate.id.as_str()),
            ("XMDM", SPORT_CODE),
            ("XQWID", CAMPUS),
            ("KYYSJD", code.as_str()),
            ("YYRQ", date.as_str()),
            ("YYLX", BOOKING_KIND),
            ("YYKS", start.as_str()),
            ("YYJS", end.as_str()),
            ("PC_OR_PHONE", "pc"),
        ];

        let response = match self.post_form(session, &self.endpoints.booking()?, &form).await {
            Ok(response) => response,
            // A non-2xx answer is inconclusive, not a transport failure
            Err(Error::Fetch(FetchError::Status(status))) => {
                debug!(status, "Booking endpoint returned error status");
                return Ok(BookingOutcome::Unknown);
            }
            Err(e) => return Err(e),
        };

        let body = response.text().await.map_err(FetchError::from_reqwest)?;
        let outcome = classify_booking_response(&body);
        debug!(outcome = outcome.as_str(), body = truncate(&body, 200), "Booking response");
        Ok(outcome)
    }
}
