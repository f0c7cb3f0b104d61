use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::parse::{parse_time, parse_weekday, CalendarError};

const DAY_SECS: u32 = 86_400;
const WEEK_SECS: u32 = 7 * DAY_SECS;

// ---------------------------------------------------------------------------
// Rule types
// ---------------------------------------------------------------------------

/// Which instants an instrument accepts trades at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradingCalendarRule {
    /// 24/7. Every instant is tradable (crypto, tests that do not care).
    AlwaysOn,

    /// A weekly session in the exchange's local time, optionally interrupted
    /// by a daily maintenance break and closed on listed holidays.
    WeeklySession(WeeklySession),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklySession {
    pub tz: Tz,
    /// First tradable instant of the trading week.
    pub open: WeekTime,
    /// First non-tradable instant after the trading week.
    pub close: WeekTime,
    /// Daily halt, applied on every day of the week.
    pub daily_break: Option<DailyBreak>,
    /// Local calendar dates on which the market is closed all day.
    pub holidays: Vec<NaiveDate>,
}

/// A weekday plus a local wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekTime {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeekTime {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// Parse `"Sun 18:00"`.
    pub fn parse(s: &str) -> Result<Self, CalendarError> {
        let mut parts = s.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CalendarError::InvalidWeekTime(s.to_string()));
        };
        Ok(Self {
            weekday: parse_weekday(day)?,
            time: parse_time(time)?,
        })
    }

    fn secs_of_week(&self) -> u32 {
        self.weekday.num_days_from_sunday() * DAY_SECS + self.time.num_seconds_from_midnight()
    }
}

impl fmt::Display for WeekTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.weekday, self.time.format("%H:%M"))
    }
}

/// `[start, end)` local time, closed. `start > end` wraps past midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailyBreak {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum ClosedReason {
    /// Outside the weekly open/close.
    Weekend,
    /// Inside the daily maintenance break.
    DailyBreak,
    Holiday(NaiveDate),
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosedReason::Weekend => write!(f, "outside the weekly trading session"),
            ClosedReason::DailyBreak => write!(f, "inside the daily maintenance break"),
            ClosedReason::Holiday(d) => write!(f, "exchange holiday {d}"),
        }
    }
}

/// One uninterrupted stretch of tradable time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub open: DateTime<Tz>,
    pub close: DateTime<Tz>,
}

// ---------------------------------------------------------------------------
// Rule logic
// ---------------------------------------------------------------------------

impl TradingCalendarRule {
    /// COMEX metals (gold futures) as traded from New York:
    /// Sun 18:00 to Fri 17:00 America/New_York, halted 17:00-18:00 daily.
    pub fn comex_metals() -> Self {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        TradingCalendarRule::WeeklySession(WeeklySession {
            tz: chrono_tz::America::New_York,
            open: WeekTime::new(Weekday::Sun, t(18)),
            close: WeekTime::new(Weekday::Fri, t(17)),
            daily_break: Some(DailyBreak {
                start: t(17),
                end: t(18),
            }),
            holidays: Vec::new(),
        })
    }

    pub fn timezone(&self) -> Option<Tz> {
        match self {
            TradingCalendarRule::AlwaysOn => None,
            TradingCalendarRule::WeeklySession(ws) => Some(ws.tz),
        }
    }

    /// `Ok(())` when `instant` is tradable, otherwise why not.
    ///
    /// Precedence: weekend, then holiday, then daily break.
    pub fn check<Z: TimeZone>(&self, instant: &DateTime<Z>) -> Result<(), ClosedReason> {
        match self {
            TradingCalendarRule::AlwaysOn => Ok(()),
            TradingCalendarRule::WeeklySession(ws) => ws.check(instant),
        }
    }

    pub fn is_tradable<Z: TimeZone>(&self, instant: &DateTime<Z>) -> bool {
        self.check(instant).is_ok()
    }

    /// The session containing a tradable `instant`; `None` when closed.
    ///
    /// `AlwaysOn` has no session boundaries and also returns `None`.
    pub fn session_containing<Z: TimeZone>(&self, instant: &DateTime<Z>) -> Option<Session> {
        match self {
            TradingCalendarRule::AlwaysOn => None,
            TradingCalendarRule::WeeklySession(ws) => ws.session_containing(instant),
        }
    }

    /// One-line human description, used in troubleshooting output.
    pub fn describe(&self) -> String {
        match self {
            TradingCalendarRule::AlwaysOn => "trades 24/7".to_string(),
            TradingCalendarRule::WeeklySession(ws) => {
                let mut s = format!("trades {} to {} {}", ws.open, ws.close, ws.tz.name());
                if let Some(b) = ws.daily_break {
                    s.push_str(&format!(
                        ", daily break {}-{}",
                        b.start.format("%H:%M"),
                        b.end.format("%H:%M")
                    ));
                }
                if !ws.holidays.is_empty() {
                    s.push_str(&format!(", {} listed holiday(s)", ws.holidays.len()));
                }
                s
            }
        }
    }
}

impl WeeklySession {
    pub fn check<Z: TimeZone>(&self, instant: &DateTime<Z>) -> Result<(), ClosedReason> {
        let local = instant.with_timezone(&self.tz);
        let s = secs_of_week(&local);

        if !contains(&self.weekly_intervals(), s) {
            return Err(ClosedReason::Weekend);
        }
        let date = local.date_naive();
        if self.holidays.contains(&date) {
            return Err(ClosedReason::Holiday(date));
        }
        if !contains(&self.open_intervals(), s) {
            return Err(ClosedReason::DailyBreak);
        }
        Ok(())
    }

    pub fn session_containing<Z: TimeZone>(&self, instant: &DateTime<Z>) -> Option<Session> {
        self.check(instant).ok()?;

        let local = instant.with_timezone(&self.tz);
        let s = secs_of_week(&local);
        let intervals = self.open_intervals();
        let &(start, end) = intervals.iter().find(|(a, b)| *a <= s && s < *b)?;

        // Stitch across the Sunday 00:00 seam when the session wraps the week.
        let mut open = i64::from(start);
        let mut close = i64::from(end);
        if start == 0 {
            if let Some(&(a, _)) = intervals.iter().find(|(_, b)| *b == WEEK_SECS) {
                open = i64::from(a) - i64::from(WEEK_SECS);
            }
        }
        if end == WEEK_SECS {
            if let Some(&(_, b)) = intervals.iter().find(|(a, _)| *a == 0) {
                close = i64::from(WEEK_SECS) + i64::from(b);
            }
        }

        let week_start = local
            .date_naive()
            .checked_sub_days(Days::new(u64::from(local.weekday().num_days_from_sunday())))?;

        Some(Session {
            open: self.resolve(week_start, open)?,
            close: self.resolve(week_start, close)?,
        })
    }

    /// The weekly open..close span, before breaks are cut out.
    fn weekly_intervals(&self) -> Vec<(u32, u32)> {
        let open = self.open.secs_of_week();
        let close = self.close.secs_of_week();
        if open < close {
            vec![(open, close)]
        } else if open > close {
            vec![(0, close), (open, WEEK_SECS)]
        } else {
            vec![(0, WEEK_SECS)]
        }
    }

    /// Tradable half-open intervals in seconds-of-week, sorted.
    fn open_intervals(&self) -> Vec<(u32, u32)> {
        let mut out = self.weekly_intervals();
        let Some(b) = self.daily_break else {
            return out;
        };

        let bs = b.start.num_seconds_from_midnight();
        let be = b.end.num_seconds_from_midnight();
        for day in 0..7u32 {
            let base = day * DAY_SECS;
            if bs < be {
                out = subtract(&out, (base + bs, base + be));
            } else if bs > be {
                // Wraps midnight: tail of `day`, head of the next day.
                out = subtract(&out, (base + bs, base + DAY_SECS));
                let next = ((day + 1) % 7) * DAY_SECS;
                out = subtract(&out, (next, next + be));
            }
        }
        out.retain(|(a, b)| a < b);
        out.sort_unstable();
        out
    }

    fn resolve(&self, week_start: NaiveDate, offset_secs: i64) -> Option<DateTime<Tz>> {
        let naive = week_start.and_time(NaiveTime::MIN) + Duration::seconds(offset_secs);
        self.tz.from_local_datetime(&naive).earliest()
    }
}

fn secs_of_week<Z: TimeZone>(local: &DateTime<Z>) -> u32 {
    local.weekday().num_days_from_sunday() * DAY_SECS + local.time().num_seconds_from_midnight()
}

fn contains(intervals: &[(u32, u32)], s: u32) -> bool {
    intervals.iter().any(|(a, b)| *a <= s && s < *b)
}

fn subtract(intervals: &[(u32, u32)], cut: (u32, u32)) -> Vec<(u32, u32)> {
    let (cs, ce) = cut;
    let mut out = Vec::with_capacity(intervals.len() + 1);
    for &(a, b) in intervals {
        if ce <= a || cs >= b {
            out.push((a, b));
            continue;
        }
        if a < cs {
            out.push((a, cs));
        }
        if ce < b {
            out.push((ce, b));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests (fast, no external dependencies)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
    }

    // Reference week (June 2025, EDT):
    //   2025-06-08 Sun, 2025-06-09 Mon, 2025-06-10 Tue, 2025-06-13 Fri, 2025-06-14 Sat

    #[test]
    fn tuesday_midday_is_tradable() {
        let rule = TradingCalendarRule::comex_metals();
        assert_eq!(rule.check(&ny(2025, 6, 10, 12, 30)), Ok(()));
    }

    #[test]
    fn saturday_is_weekend() {
        let rule = TradingCalendarRule::comex_metals();
        assert_eq!(
            rule.check(&ny(2025, 6, 14, 12, 0)),
            Err(ClosedReason::Weekend)
        );
    }

    #[test]
    fn sunday_morning_is_weekend() {
        let rule = TradingCalendarRule::comex_metals();
        assert_eq!(
            rule.check(&ny(2025, 6, 8, 10, 0)),
            Err(ClosedReason::Weekend)
        );
    }

    #[test]
    fn daily_break_is_closed() {
        let rule = TradingCalendarRule::comex_metals();
        assert_eq!(
            rule.check(&ny(2025, 6, 9, 17, 30)),
            Err(ClosedReason::DailyBreak)
        );
    }

    #[test]
    fn boundaries_are_half_open() {
        let rule = TradingCalendarRule::comex_metals();
        // Weekly open minute is tradable, weekly close minute is not.
        assert!(rule.is_tradable(&ny(2025, 6, 8, 18, 0)));
        assert_eq!(
            rule.check(&ny(2025, 6, 13, 17, 0)),
            Err(ClosedReason::Weekend)
        );
        assert!(rule.is_tradable(&ny(2025, 6, 13, 16, 59)));
        // Break start is closed, break end is open.
        assert!(!rule.is_tradable(&ny(2025, 6, 10, 17, 0)));
        assert!(rule.is_tradable(&ny(2025, 6, 10, 18, 0)));
    }

    #[test]
    fn holiday_is_closed() {
        let mut rule = TradingCalendarRule::comex_metals();
        let juneteenth = NaiveDate::from_ymd_opt(2025, 6, 19).unwrap();
        if let TradingCalendarRule::WeeklySession(ws) = &mut rule {
            ws.holidays.push(juneteenth);
        }
        assert_eq!(
            rule.check(&ny(2025, 6, 19, 10, 0)),
            Err(ClosedReason::Holiday(juneteenth))
        );
    }

    #[test]
    fn utc_instants_are_localised_first() {
        let rule = TradingCalendarRule::comex_metals();
        // 2025-06-10 16:30 UTC = 12:30 EDT.
        let utc = chrono::Utc.with_ymd_and_hms(2025, 6, 10, 16, 30, 0).unwrap();
        assert!(rule.is_tradable(&utc));
    }

    #[test]
    fn session_spans_break_to_break() {
        let rule = TradingCalendarRule::comex_metals();
        let s = rule.session_containing(&ny(2025, 6, 10, 12, 30)).unwrap();
        assert_eq!(s.open, ny(2025, 6, 9, 18, 0));
        assert_eq!(s.close, ny(2025, 6, 10, 17, 0));
    }

    #[test]
    fn first_session_of_week_opens_sunday() {
        let rule = TradingCalendarRule::comex_metals();
        let s = rule.session_containing(&ny(2025, 6, 9, 3, 0)).unwrap();
        assert_eq!(s.open, ny(2025, 6, 8, 18, 0));
        assert_eq!(s.close, ny(2025, 6, 9, 17, 0));
    }

    #[test]
    fn closed_instant_has_no_session() {
        let rule = TradingCalendarRule::comex_metals();
        assert!(rule.session_containing(&ny(2025, 6, 14, 12, 0)).is_none());
    }

    #[test]
    fn always_on_includes_weekend() {
        let rule = TradingCalendarRule::AlwaysOn;
        assert!(rule.is_tradable(&ny(2025, 6, 14, 12, 0)));
        assert!(rule.session_containing(&ny(2025, 6, 14, 12, 0)).is_none());
    }

    #[test]
    fn week_time_parse_and_display() {
        let wt = WeekTime::parse("Sun 18:00").unwrap();
        assert_eq!(wt.weekday, Weekday::Sun);
        assert_eq!(wt.to_string(), "Sun 18:00");
        assert!(WeekTime::parse("Sun").is_err());
        assert!(WeekTime::parse("Sun 18:00 extra").is_err());
    }

    #[test]
    fn describe_mentions_break() {
        let d = TradingCalendarRule::comex_metals().describe();
        assert_eq!(
            d,
            "trades Sun 18:00 to Fri 17:00 America/New_York, daily break 17:00-18:00"
        );
    }

    #[test]
    fn subtract_splits_interval() {
        assert_eq!(subtract(&[(0, 100)], (40, 60)), vec![(0, 40), (60, 100)]);
        assert_eq!(subtract(&[(0, 100)], (100, 120)), vec![(0, 100)]);
        assert_eq!(subtract(&[(50, 100)], (0, 60)), vec![(60, 100)]);
    }
}
