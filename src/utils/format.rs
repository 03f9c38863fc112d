//! Text formatting shared by the panels.

use std::time::Duration;
use thousands::Separable;

/// Format a duration into a clock string (e.g., "3:45" or "1:23:45")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Long-running uptimes, e.g. "2d 03:04:05".
pub fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let days = total_seconds / 86_400;
    let rest = Duration::from_secs(total_seconds % 86_400);
    let hours = rest.as_secs() / 3600;
    let clock = format!(
        "{:02}:{:02}:{:02}",
        hours,
        (rest.as_secs() % 3600) / 60,
        rest.as_secs() % 60
    );

    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable byte count using binary multiples, e.g. "1.50 GB".
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn format_count(count: impl Separable) -> String {
    count.separate_with_commas()
}

/// Prefix every line with a zero-padded line number: `001 | text`.
pub fn number_lines(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| format!("{:03} | {}", index + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
