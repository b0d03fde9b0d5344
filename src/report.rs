//! Fixed width summary printed at the end of a successful run

use chrono::{DateTime, Utc};
use std::fmt;

pub const WIDTH: usize = 60;

/// Inner width, between `│ ` and ` │`
const INNER: usize = WIDTH - 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub rows: Vec<(String, String)>,
    pub next_steps: Vec<String>,
}

impl Summary {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn row(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push((label.into(), value.into()));
        self
    }

    #[must_use]
    pub fn next_step(mut self, step: impl Into<String>) -> Self {
        self.next_steps.push(step.into());
        self
    }

    /// Value of the first row with `label`
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "─".repeat(WIDTH - 2);
        let label_width = self
            .rows
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        writeln!(f, "┌{rule}┐")?;
        writeln!(f, "│ {} │", fit(&center(&self.title, INNER)))?;
        writeln!(f, "├{rule}┤")?;
        for (label, value) in &self.rows {
            let line = format!("{label:<label_width$}  {value}");
            writeln!(f, "│ {} │", fit(&line))?;
        }
        write!(f, "└{rule}┘")?;

        if !self.next_steps.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "Next steps:")?;
            for (index, step) in self.next_steps.iter().enumerate() {
                write!(f, "\n  {}. {step}", index + 1)?;
            }
        }
        Ok(())
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{text}", " ".repeat(left))
}

/// Pad or truncate to exactly [`INNER`] characters
fn fit(text: &str) -> String {
    let len = text.chars().count();
    if len > INNER {
        let mut out: String = text.chars().take(INNER - 1).collect();
        out.push('…');
        out
    } else {
        format!("{text}{}", " ".repeat(INNER - len))
    }
}

/// Replace the password of a connection URI with `****`
#[must_use]
pub fn mask_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return uri.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => uri.to_string(),
    }
}

/// `in 13d 4h`, `in 42m`, `expired 2d ago` or `never`
#[must_use]
pub fn format_countdown(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(expires_at) = expires_at else {
        return "never".to_string();
    };
    let delta = expires_at - now;
    let (prefix, suffix, delta) = if delta.num_seconds() >= 0 {
        ("in ", "", delta)
    } else {
        ("expired ", " ago", -delta)
    };

    let days = delta.num_days();
    let hours = delta.num_hours() % 24;
    let minutes = delta.num_minutes() % 60;
    let span = match (days, hours) {
        (0, 0) => format!("{minutes}m"),
        (0, h) => format!("{h}h {minutes}m"),
        (d, h) => format!("{d}d {h}h"),
    };
    format!("{prefix}{span}{suffix}")
}

/// Printed after a failure, before the error itself
pub fn print_troubleshooting(tips: &[&str]) {
    if tips.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("Troubleshooting:");
    for tip in tips {
        eprintln!("  • {tip}");
    }
    eprintln!();
}

/// Warnings go to stderr and never abort a workflow
pub fn warning(message: impl fmt::Display) {
    eprintln!("warning: {message}");
}

/// Progress line on stdout
pub fn step(message: impl fmt::Display) {
    println!("→ {message}");
}
