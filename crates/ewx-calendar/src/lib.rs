//! ewx-calendar
//!
//! Tradable-hours rules for a single instrument.
//!
//! Deterministic, pure logic. No IO, no wall-clock. The caller supplies the
//! instant; the rule answers whether the market accepts trades at that instant
//! and, if so, which trading session contains it.
//!
//! Rules are instrument configuration, not universal law. Boundaries are
//! half-open: a session is tradable on `[open, close)` and a daily break is
//! closed on `[start, end)`.

mod parse;
mod rule;

pub use parse::{parse_time, parse_weekday, CalendarError};
pub use rule::*;
