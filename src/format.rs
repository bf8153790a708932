//! Display formatting for timer values and stats.

use crate::models::{TimerMode, TimerState};

/// Formats seconds as `MM:SS`, or `H:MM:SS` from one hour upwards.
pub fn format_time(secs: u32) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// Formats a minute total for the stats panel, e.g. `1h 5m` or `25m`.
pub fn format_minutes(mins: u32) -> String {
    let hours = mins / 60;
    let mins = mins % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// One-line status for the current state.
pub fn format_title(state: &TimerState) -> String {
    let label = match state.mode() {
        TimerMode::Pomodoro => state.phase().label(),
        mode => mode.label(),
    };
    let time = format_time(state.display_secs());
    if state.is_running() {
        format!("{} {}", label, time)
    } else {
        format!("⏸ {} {}", label, time)
    }
}
