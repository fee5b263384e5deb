//! Hidden-field extraction from the identity provider's login page
//!
//! The login page renders `form#pwdFromId` with four anti-forgery inputs and
//! the password salt. All five are required; a page without them means the
//! provider changed its markup and no amount of retrying will help.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::utils::error::ScrapeError;

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

const LOGIN_FORM: &str = "form#pwdFromId";

lazy_static! {
    static ref FORM: Selector = parse_selector!("form#pwdFromId");
    static ref LT: Selector = parse_selector!("input[name=lt]");
    static ref DLLT: Selector = parse_selector!("input[name=dllt]");
    static ref EXECUTION: Selector = parse_selector!("input[name=execution]");
    static ref EVENT_ID: Selector = parse_selector!("input[name=_eventId]");
    static ref SALT: Selector = parse_selector!("input#pwdEncryptSalt");
}

/// Tokens harvested from the rendered login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Login ticket (`lt`)
    pub lt: String,
    /// Sub-flow marker (`dllt`)
    pub dllt: String,
    /// Execution token (`execution`)
    pub execution: String,
    /// Event id (`_eventId`)
    pub event_id: String,
    /// Password salt (`#pwdEncryptSalt`)
    pub salt: String,
}

impl LoginForm {
    /// Extract the login tokens from page HTML
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::FormNotFound` if the form is absent and
    /// `ScrapeError::MissingField` naming the first input that is absent.
    pub fn parse(html: &str) -> Result<Self, ScrapeError> {
        let document = Html::parse_document(html);
        let form = document
            .select(&FORM)
            .next()
            .ok_or_else(|| ScrapeError::FormNotFound(LOGIN_FORM.to_string()))?;

        Ok(Self {
            lt: input_value(form, &LT, "lt")?,
            dllt: input_value(form, &DLLT, "dllt")?,
            execution: input_value(form, &EXECUTION, "execution")?,
            event_id: input_value(form, &EVENT_ID, "_eventId")?,
            salt: input_value(form, &SALT, "pwdEncryptSalt")?,
        })
    }

    /// Form body for the login POST
    pub fn login_fields<'a>(&'a self, username: &'a str, password: &'a str) -> [(&'static str, &'a str); 6] {
        [
            ("username", username),
            ("password", password),
            ("lt", &self.lt),
            ("dllt", &self.dllt),
            ("execution", &self.execution),
            ("_eventId", &self.event_id),
        ]
    }
}

/// `value` attribute of the first match; an input without `value` counts as missing
fn input_value(form: ElementRef<'_>, selector: &Selector, field: &str) -> Result<String, ScrapeError> {
    form.select(selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::MissingField(field.to_string()))
}
