// Core data structures for the reservation engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Second-slot value meaning "no second slot"
pub const NO_SECOND_SLOT: &str = "00:00";

/// Requested start time of a one-hour window (`HH:MM`, only the hour matters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotTime {
    pub hour: u8,
    pub minute: u8,
}

impl SlotTime {
    /// Parse an `HH:MM` string
    pub fn parse(s: &str) -> Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::config(format!("Invalid time '{s}'. Expected HH:MM")))?;

        let hour: u8 = h
            .parse()
            .map_err(|_| Error::config(format!("Invalid hour in '{s}'")))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| Error::config(format!("Invalid minute in '{s}'")))?;

        // The window ends one hour later and must stay within the day
        if hour > 22 || minute > 59 {
            return Err(Error::config(format!("Time '{s}' out of range")));
        }

        Ok(Self { hour, minute })
    }

    /// Parse the second time, mapping the sentinel and blanks to `None`
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        let s = s.trim();
        if s.is_empty() || s == NO_SECOND_SLOT {
            return Ok(None);
        }
        Self::parse(s).map(Some)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One of the (at most two) booking tracks of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackId {
    First,
    Second,
}

impl TrackId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who to book for and what to book
///
/// Immutable for the duration of a run; session cookies live separately in
/// [`crate::session::SessionState`].
#[derive(Clone, Serialize, Deserialize)]
pub struct UserCredentials {
    pub user_id: String,
    pub user_name: String,
    pub password: String,
    pub phone_number: String,
    pub sport_date: NaiveDate,
    pub first_time: SlotTime,
    pub second_time: Option<SlotTime>,
    pub execute_now: bool,
}

impl UserCredentials {
    /// Build credentials from the raw strings an operator submits
    #[allow(clippy::too_many_arguments)]
    pub fn from_form(
        user_id: &str,
        user_name: &str,
        password: &str,
        phone_number: &str,
        sport_date: &str,
        first_time: &str,
        second_time: &str,
        execute_now: bool,
    ) -> Result<Self> {
        if user_id.trim().is_empty() || user_name.trim().is_empty() || password.is_empty() {
            return Err(Error::config("user id, name and password are required"));
        }

        let sport_date = NaiveDate::parse_from_str(sport_date.trim(), "%Y-%m-%d")
            .map_err(|_| Error::config(format!("Invalid date '{sport_date}'. Expected YYYY-MM-DD")))?;

        Ok(Self {
            user_id: user_id.trim().to_string(),
            user_name: user_name.trim().to_string(),
            password: password.to_string(),
            phone_number: phone_number.trim().to_string(),
            sport_date,
            first_time: SlotTime::parse(first_time)?,
            second_time: SlotTime::parse_optional(second_time)?,
            execute_now,
        })
    }

    /// Requested time for a track, `None` when the track is not wanted
    pub fn time_for(&self, track: TrackId) -> Option<SlotTime> {
        match track {
            TrackId::First => Some(self.first_time),
            TrackId::Second => self.second_time,
        }
    }

    /// Tracks this run needs, in order
    pub fn tracks(&self) -> Vec<TrackId> {
        let mut tracks = vec![TrackId::First];
        if self.second_time.is_some() {
            tracks.push(TrackId::Second);
        }
        tracks
    }
}

// Password stays out of logs
impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("sport_date", &self.sport_date)
            .field("first_time", &self.first_time)
            .field("second_time", &self.second_time)
            .field("execute_now", &self.execute_now)
            .finish_non_exhaustive()
    }
}

/// A bookable room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub id: String,
    pub name: String,
}

/// Fixed listing of rooms for the target sport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomCatalog {
    rooms: Vec<SlotCandidate>,
}

impl RoomCatalog {
    pub fn new(rooms: Vec<SlotCandidate>) -> Self {
        Self { rooms }
    }

    /// Parse a JSON array of `{ "id", "name" }`
    pub fn from_json(json: &str) -> Result<Self> {
        let rooms: Vec<SlotCandidate> = serde_json::from_str(json)?;
        Ok(Self { rooms })
    }

    /// Load the catalog from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Like [`Self::from_file`], but a missing file yields an empty catalog
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Room catalog not found, using an empty catalog");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn rooms(&self) -> &[SlotCandidate] {
        &self.rooms
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

/// One-time order number required by a booking submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderToken(pub String);

impl OrderToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
