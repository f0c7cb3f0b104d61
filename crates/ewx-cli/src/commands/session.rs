//! `ewx session`: is the configured instrument tradable at an instant?

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use ewx_calendar::TradingCalendarRule;

use super::load_config;

pub fn session(config_paths: &[String], at: &str) -> Result<()> {
    let cfg = load_config(config_paths)?.analysis()?;
    let tz = cfg.timezone()?;
    let rule = cfg.calendar_rule()?;
    let instant = ewx_config::parse_event_time(at, tz)
        .with_context(|| format!("invalid --at '{at}'"))?;

    for line in session_lines(&rule, &instant) {
        println!("{line}");
    }
    Ok(())
}

/// `key=value` lines describing the rule's state at `instant`.
pub fn session_lines<Z: TimeZone>(rule: &TradingCalendarRule, instant: &DateTime<Z>) -> Vec<String>
where
    Z::Offset: std::fmt::Display,
{
    let mut out = vec![format!("instant={}", instant.to_rfc3339())];
    match rule.check(instant) {
        Ok(()) => {
            out.push("tradable=true".to_string());
            if let Some(s) = rule.session_containing(instant) {
                out.push(format!("session_open={}", s.open.to_rfc3339()));
                out.push(format!("session_close={}", s.close.to_rfc3339()));
            }
        }
        Err(reason) => {
            out.push("tradable=false".to_string());
            out.push(format!("reason={reason}"));
        }
    }
    out.push(format!("rule={}", rule.describe()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn saturday_is_closed() {
        let at = New_York.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap();
        let lines = session_lines(&TradingCalendarRule::comex_metals(), &at);
        assert_eq!(lines[0], "instant=2025-06-14T12:00:00-04:00");
        assert_eq!(lines[1], "tradable=false");
        assert_eq!(lines[2], "reason=outside the weekly trading session");
    }

    #[test]
    fn tuesday_noon_reports_session_bounds() {
        let at = New_York.with_ymd_and_hms(2025, 6, 10, 12, 30, 0).unwrap();
        let lines = session_lines(&TradingCalendarRule::comex_metals(), &at);
        assert_eq!(lines[1], "tradable=true");
        assert_eq!(lines[2], "session_open=2025-06-09T18:00:00-04:00");
        assert_eq!(lines[3], "session_close=2025-06-10T17:00:00-04:00");
    }

    #[test]
    fn always_on_has_no_session_bounds() {
        let at = New_York.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap();
        let lines = session_lines(&TradingCalendarRule::AlwaysOn, &at);
        assert_eq!(lines[1], "tradable=true");
        assert!(lines[2].starts_with("rule="));
    }
}
