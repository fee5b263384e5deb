//! Wire types returned by the portal's JSON endpoints
//!
//! Only a handful of fields carry meaning: the entry code, the `disabled`
//! flag and the status label. Everything else the portal sends is ignored.

use serde::Deserialize;

use crate::booking::window::AvailabilityWindow;

/// Status label the portal puts on bookable entries
pub const BOOKABLE_LABEL: &str = "可预约";

/// Substring marking a declined booking submission
pub const FAILURE_MARKER: &str = "false";

/// One entry of the time-list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeSlotEntry {
    #[serde(rename = "CODE")]
    pub code: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "STATE_EXPLAIN")]
    pub state_explain: String,
    #[serde(rename = "WID")]
    pub wid: String,
    pub disabled: bool,
    pub text: String,
}

impl TimeSlotEntry {
    pub fn is_bookable(&self) -> bool {
        !self.disabled && self.text == BOOKABLE_LABEL
    }
}

/// One row of the opening-room endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoomEntry {
    #[serde(rename = "WID")]
    pub wid: String,
    #[serde(rename = "CDMC")]
    pub room_name: String,
    pub disabled: bool,
    pub text: String,
}

impl RoomEntry {
    pub fn is_bookable(&self) -> bool {
        !self.disabled && self.text == BOOKABLE_LABEL
    }
}

/// Envelope of the opening-room endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpeningRoomResponse {
    pub code: String,
    pub datas: OpeningRoomDatas,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpeningRoomDatas {
    #[serde(rename = "getOpeningRoom")]
    pub get_opening_room: OpeningRoomPage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpeningRoomPage {
    #[serde(rename = "totalSize")]
    pub total_size: u32,
    pub rows: Vec<RoomEntry>,
}

impl OpeningRoomResponse {
    pub fn into_rows(self) -> Vec<RoomEntry> {
        self.datas.get_opening_room.rows
    }
}

/// Body of the order-number endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OrderNumberResponse {
    #[serde(rename = "DHID")]
    pub dhid: String,
}

/// Whether any time-list entry opens `window`
pub fn is_time_slot_open(entries: &[TimeSlotEntry], window: &AvailabilityWindow) -> bool {
    let code = window.code();
    entries
        .iter()
        .any(|entry| entry.code == code && entry.is_bookable())
}

/// Whether `room_id` is listed as bookable
pub fn is_room_open(rows: &[RoomEntry], room_id: &str) -> bool {
    rows.iter().any(|row| row.wid == room_id && row.is_bookable())
}

/// Interpretation of a booking submission body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    Accepted,
    Rejected,
    /// Nothing usable came back; retried like a rejection
    Unknown,
}

impl BookingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

/// Classify the free-text body of a booking submission
///
/// The portal has no structured status for this call: a body containing the
/// failure marker is a rejection, an empty body is unknown, anything else is
/// an acceptance.
pub fn classify_booking_response(body: &str) -> BookingOutcome {
    if body.contains(FAILURE_MARKER) {
        BookingOutcome::Rejected
    } else if body.trim().is_empty() {
        BookingOutcome::Unknown
    } else {
        BookingOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> AvailabilityWindow {
        AvailabilityWindow::for_slot(
            NaiveDate::from_ymd_opt(2024, 9, 17).unwrap(),
            crate::models::SlotTime { hour: 20, minute: 0 },
        )
    }

    fn entry(code: &str, disabled: bool, text: &str) -> TimeSlotEntry {
        TimeSlotEntry {
            code: code.to_string(),
            disabled,
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_time_list_deserialize() {
        let json = r#"[
            {"CODE":"19:00-20:00","NAME":"19:00-20:00","STATE_EXPLAIN":"","WID":"w1","disabled":true,"text":"已约满"},
            {"CODE":"20:00-21:00","NAME":"20:00-21:00","STATE_EXPLAIN":"","WID":"w2","disabled":false,"text":"可预约"}
        ]"#;
        let entries: Vec<TimeSlotEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(is_time_slot_open(&entries, &window()));
    }

    #[test]
    fn test_disabled_flip_closes_slot() {
        let mut entries = vec![entry("20:00-21:00", false, BOOKABLE_LABEL)];
        assert!(is_time_slot_open(&entries, &window()));

        entries[0].disabled = true;
        assert!(!is_time_slot_open(&entries, &window()));
    }

    #[test]
    fn test_time_slot_requires_exact_code_and_label() {
        let entries = vec![
            entry("21:00-22:00", false, BOOKABLE_LABEL),
            entry("20:00-21:00", false, "已约满"),
        ];
        assert!(!is_time_slot_open(&entries, &window()));
        assert!(!is_time_slot_open(&[], &window()));
    }

    #[test]
    fn test_opening_room_deserialize() {
        let json = r#"{
            "code":"0",
            "datas":{"getOpeningRoom":{"pageNumber":1,"pageSize":10,"totalSize":2,"rows":[
                {"WID":"room-a","CDMC":"A1","disabled":true,"text":"已预约"},
                {"WID":"room-b","CDMC":"B2","disabled":false,"text":"可预约"}
            ]}}
        }"#;
        let response: OpeningRoomResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, "0");
        let rows = response.into_rows();
        assert!(!is_room_open(&rows, "room-a"));
        assert!(is_room_open(&rows, "room-b"));
        assert!(!is_room_open(&rows, "room-c"));
    }

    #[test]
    fn test_opening_room_missing_datas() {
        let response: OpeningRoomResponse = serde_json::from_str(r#"{"code":"1"}"#).unwrap();
        assert!(response.into_rows().is_empty());
    }

    #[test]
    fn test_classify_booking_response() {
        assert_eq!(
            classify_booking_response(r#"{"code":"0","msg":"成功","success":true}"#),
            BookingOutcome::Accepted
        );
        assert_eq!(
            classify_booking_response(r#"{"code":"1","success":false,"msg":"该场地已被预约"}"#),
            BookingOutcome::Rejected
        );
        assert_eq!(classify_booking_response("  \n"), BookingOutcome::Unknown);
        assert_eq!(classify_booking_response(""), BookingOutcome::Unknown);
    }
}
