//! SVG line chart of close prices around an event.
//!
//! Layout: two-line title, light grid, close price polyline, dashed vertical
//! event marker with a legend entry, hourly x ticks in exchange-local time.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Timelike};
use chrono_tz::Tz;
use ewx_md::PriceSeries;

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 6;

const LINE_COLOR: &str = "#FFD700";
const EVENT_COLOR: &str = "#FF0000";
const GRID_COLOR: &str = "#B0B0B0";

/// Where and how large to draw, and what to call things.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// e.g. `Gold Futures`
    pub display_name: String,
    /// e.g. `PPI Release`; also the legend entry for the event marker.
    pub event_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Render and write the chart to `spec.path`, creating parent directories.
pub fn render(
    windowed: &PriceSeries,
    event: &DateTime<Tz>,
    spec: &ChartSpec,
) -> Result<ChartArtifact> {
    let svg = render_svg(windowed, event, spec)?;

    if let Some(parent) = spec.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create chart dir failed: {}", parent.display()))?;
    }
    fs::write(&spec.path, svg.as_bytes())
        .with_context(|| format!("write chart failed: {}", spec.path.display()))?;
    let bytes = fs::metadata(&spec.path)
        .with_context(|| format!("stat chart failed: {}", spec.path.display()))?
        .len();

    Ok(ChartArtifact {
        path: spec.path.clone(),
        bytes,
    })
}

/// The SVG document as a string. Fails on an empty series.
pub fn render_svg(windowed: &PriceSeries, event: &DateTime<Tz>, spec: &ChartSpec) -> Result<String> {
    let (Some(first), Some(last)) = (windowed.first(), windowed.last()) else {
        bail!("cannot chart an empty series for {}", windowed.symbol());
    };

    let w = f64::from(spec.width);
    let h = f64::from(spec.height);
    let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = h - MARGIN_TOP - MARGIN_BOTTOM;

    // X domain covers the bars and the event marker.
    let mut t0 = first.ts.min(*event);
    let mut t1 = last.ts.max(*event);
    if t1 <= t0 {
        t0 -= windowed.interval().duration();
        t1 += windowed.interval().duration();
    }
    let span = (t1 - t0).num_seconds() as f64;
    let x_of = |ts: &DateTime<Tz>| MARGIN_LEFT + (*ts - t0).num_seconds() as f64 / span * plot_w;

    let (lo, hi) = windowed
        .bars()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            (lo.min(b.close), hi.max(b.close))
        });
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    let (y_min, y_max) = (lo - pad, hi + pad);
    let y_of = |px: f64| MARGIN_TOP + (y_max - px) / (y_max - y_min) * plot_h;

    let mut out = String::with_capacity(8 * 1024 + windowed.len() * 16);
    // `write!` into a String cannot fail.
    let _ = writeln!(
        out,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-family="sans-serif">"##,
        spec.width, spec.height, spec.width, spec.height
    );
    let _ = writeln!(out, r##"<rect width="100%" height="100%" fill="#FFFFFF"/>"##);

    // Title
    let title = format!(
        "{} ({}) Around {}",
        spec.display_name,
        windowed.symbol(),
        spec.event_label
    );
    let _ = writeln!(
        out,
        r##"<text x="{:.1}" y="32" font-size="20" text-anchor="middle">{}</text>"##,
        w / 2.0,
        escape(&title)
    );
    let _ = writeln!(
        out,
        r##"<text x="{:.1}" y="56" font-size="16" text-anchor="middle">{}</text>"##,
        w / 2.0,
        event.format("%Y-%m-%d")
    );

    // Horizontal grid + y labels
    for i in 0..=Y_TICKS {
        let px = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
        let y = y_of(px);
        let _ = writeln!(
            out,
            r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID_COLOR}" stroke-opacity="0.3"/>"##,
            MARGIN_LEFT,
            MARGIN_LEFT + plot_w
        );
        let _ = writeln!(
            out,
            r##"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{px:.2}</text>"##,
            MARGIN_LEFT - 8.0,
            y + 4.0
        );
    }

    // Vertical grid + hourly x labels
    for tick in hourly_ticks(t0, t1) {
        let x = x_of(&tick);
        let _ = writeln!(
            out,
            r##"<line class="x-tick" x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{GRID_COLOR}" stroke-opacity="0.3"/>"##,
            MARGIN_TOP,
            MARGIN_TOP + plot_h
        );
        let _ = writeln!(
            out,
            r##"<text x="{x:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"##,
            MARGIN_TOP + plot_h + 20.0,
            tick.format("%H:%M")
        );
    }

    // Axes frame
    let _ = writeln!(
        out,
        r##"<rect x="{:.1}" y="{:.1}" width="{plot_w:.1}" height="{plot_h:.1}" fill="none" stroke="#000000"/>"##,
        MARGIN_LEFT, MARGIN_TOP
    );
    let _ = writeln!(
        out,
        r##"<text x="24" y="{:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 24 {:.1})">Price (USD)</text>"##,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    // Close series
    let points = windowed
        .bars()
        .iter()
        .map(|b| format!("{:.1},{:.1}", x_of(&b.ts), y_of(b.close)))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(
        out,
        r##"<polyline fill="none" stroke="{LINE_COLOR}" stroke-width="2" points="{points}"/>"##
    );

    // Event marker
    let ex = x_of(event);
    let _ = writeln!(
        out,
        r##"<line class="event" x1="{ex:.1}" y1="{:.1}" x2="{ex:.1}" y2="{:.1}" stroke="{EVENT_COLOR}" stroke-width="1.5" stroke-dasharray="6,4"/>"##,
        MARGIN_TOP,
        MARGIN_TOP + plot_h
    );

    // Legend (top right of plot, never left of the y axis)
    let lx = (MARGIN_LEFT + plot_w - 170.0).max(MARGIN_LEFT);
    let ly = MARGIN_TOP + 12.0;
    let _ = writeln!(
        out,
        r##"<rect x="{lx:.1}" y="{ly:.1}" width="160" height="28" fill="#FFFFFF" stroke="#CCCCCC"/>"##
    );
    let _ = writeln!(
        out,
        r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{EVENT_COLOR}" stroke-width="1.5" stroke-dasharray="6,4"/>"##,
        lx + 10.0,
        ly + 14.0,
        lx + 40.0,
        ly + 14.0
    );
    let _ = writeln!(
        out,
        r##"<text x="{:.1}" y="{:.1}" font-size="12">{}</text>"##,
        lx + 48.0,
        ly + 18.0,
        escape(&spec.event_label)
    );

    out.push_str("</svg>\n");
    Ok(out)
}

/// Whole local hours within `[t0, t1]`.
fn hourly_ticks(t0: DateTime<Tz>, t1: DateTime<Tz>) -> Vec<DateTime<Tz>> {
    let tz = t0.timezone();
    let local = t0.naive_local();
    let floor = local
        .date()
        .and_hms_opt(local.hour(), 0, 0)
        .and_then(|n| tz.from_local_datetime(&n).earliest());
    let Some(mut tick) = floor else {
        return Vec::new();
    };
    if tick < t0 {
        tick += Duration::hours(1);
    }

    let mut ticks = Vec::new();
    while tick <= t1 {
        ticks.push(tick);
        tick += Duration::hours(1);
    }
    ticks
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
