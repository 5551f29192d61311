//! Terminal output helpers.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

/// Consistent status-line printing for commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, text: &str) {
        println!("{}", text);
    }

    /// Bold header with a rule underneath.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold());
        println!("{}", "─".repeat(50).dimmed());
    }

    /// Label in bright style followed by a value.
    pub fn info(&self, label: &str, value: &str) {
        println!("{} {}", label.bright_cyan(), value);
    }

    /// Aligned key/value pair.
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {:<14} {}", format!("{}:", key).dimmed(), value);
    }

    pub fn list_item(&self, text: &str) {
        println!("  {} {}", "•".dimmed(), text);
    }

    pub fn status(&self, text: &str) {
        println!("{}", text.dimmed());
    }

    pub fn success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text);
    }

    pub fn warning(&self, text: &str) {
        println!("{} {}", "!".yellow(), text.yellow());
    }

    pub fn error(&self, text: &str) {
        eprintln!("{} {}", "✗".bright_red(), text.bright_red());
    }
}

/// "in 3 hours", "5 minutes ago".
pub fn format_relative_time(time: DateTime<Utc>) -> String {
    format_relative_to(time, Utc::now())
}

pub fn format_relative_to(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = time - now;
    let future = delta.num_seconds() >= 0;
    let secs = delta.num_seconds().unsigned_abs();

    let amount = if secs < 60 {
        return if future { "in under a minute" } else { "just now" }.to_string();
    } else if secs < 3600 {
        plural(secs / 60, "minute")
    } else if secs < 86_400 {
        plural(secs / 3600, "hour")
    } else {
        plural(secs / 86_400, "day")
    };

    if future {
        format!("in {}", amount)
    } else {
        format!("{} ago", amount)
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
