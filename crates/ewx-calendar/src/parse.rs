use std::fmt;

use chrono::{NaiveTime, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    InvalidWeekday(String),
    InvalidTime(String),
    InvalidWeekTime(String),
    InvalidTimezone(String),
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::InvalidWeekday(s) => {
                write!(f, "invalid weekday '{s}'. expected Sun | Mon | ... | Sat")
            }
            CalendarError::InvalidTime(s) => write!(f, "invalid time '{s}'. expected HH:MM"),
            CalendarError::InvalidWeekTime(s) => {
                write!(f, "invalid weekly time '{s}'. expected e.g. 'Sun 18:00'")
            }
            CalendarError::InvalidTimezone(s) => write!(f, "unknown IANA timezone '{s}'"),
        }
    }
}

impl std::error::Error for CalendarError {}

/// Accepts three-letter or full English weekday names, any case.
pub fn parse_weekday(s: &str) -> Result<Weekday, CalendarError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| CalendarError::InvalidWeekday(s.to_string()))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime, CalendarError> {
    let t = s.trim();
    NaiveTime::parse_from_str(t, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTime(s.to_string()))
}
