//! Output formatting
//!
//! - `text`: the human-readable report printed when a control run ends
//! - `json`: the same report as a JSON file
//!
//! Progress markers go to stdout unbuffered so they show up as work flows.

pub mod json;
pub mod text;

use std::io::Write;
use std::time::Duration;

/// Print a single progress marker and flush
pub fn progress_marker(marker: char) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "{}", marker);
    let _ = stdout.flush();
}

/// Format duration in human-readable format
pub fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    }
}

/// Requests per second over `elapsed`
pub fn rate_per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    count as f64 / secs
}
