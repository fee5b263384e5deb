//! Cookie names and the per-hop rotation policy
//!
//! The provider hands out the rotating `_WEU` session cookie in ways that
//! differ from one hop to the next. Which `Set-Cookie` value to trust on each
//! hop is captured in [`rotation_rule`]; every caller goes through
//! [`extract_rotated_cookie`] so the heuristics live in one place.
//!
//! The index rules were inferred from the live provider and are not
//! documented anywhere. They must be revalidated whenever login or probing
//! starts failing for no visible reason.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Rotating session cookie
pub const SESSION_COOKIE: &str = "_WEU";

/// Long-lived authentication cookie set by the identity provider
pub const AUTH_COOKIE: &str = "MOD_AUTH_CAS";

/// Language cookie the portal expects on API calls
pub const LANG_COOKIE: (&str, &str) = ("EMAP_LANG", "zh");

/// Request/response hop where a session cookie may be rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    /// Any response in the login POST's redirect chain
    SubmitLogin,
    /// Landing-page GET that produces the working session cookie
    WarmSession,
    /// Time-list probe during a booking pass
    TimeListProbe,
}

impl Hop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitLogin => "submit_login",
            Self::WarmSession => "warm_session",
            Self::TimeListProbe => "time_list_probe",
        }
    }
}

/// How to pick the session cookie out of a hop's `Set-Cookie` headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationRule {
    /// First header whose cookie name is the session cookie
    FirstNamed,
    /// Header at `single` if exactly one is present, at `multiple` otherwise
    IndexByCount { single: usize, multiple: usize },
    /// Only rotate when exactly one header is present
    SingleOnly,
}

/// Policy table keyed by hop
pub const fn rotation_rule(hop: Hop) -> RotationRule {
    match hop {
        Hop::SubmitLogin => RotationRule::FirstNamed,
        // With two headers the provider's second one is the live session
        Hop::WarmSession => RotationRule::IndexByCount {
            single: 0,
            multiple: 1,
        },
        Hop::TimeListProbe => RotationRule::SingleOnly,
    }
}

/// Split a `Set-Cookie` value into its name and value
pub fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// Pick the rotated session cookie value for `hop`, if any
pub fn extract_rotated_cookie(headers: &HeaderMap, hop: Hop) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let picked = match rotation_rule(hop) {
        RotationRule::FirstNamed => values
            .iter()
            .filter_map(|v| parse_set_cookie(v))
            .find(|(name, _)| *name == SESSION_COOKIE),
        RotationRule::IndexByCount { single, multiple } => match values.len() {
            0 => None,
            1 => values.get(single).and_then(|v| parse_set_cookie(v)),
            _ => values.get(multiple).and_then(|v| parse_set_cookie(v)),
        },
        RotationRule::SingleOnly => match values.as_slice() {
            [only] => parse_set_cookie(only),
            _ => None,
        },
    };

    picked
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Value of `name` inside an outgoing `Cookie` header
pub fn find_in_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}
