//! Line preserving editor for flat `KEY=VALUE` files (`.env`)
//!
//! Only the targeted key is rewritten, every other line is kept byte for byte
//! including comments, blank lines and line endings.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Read the whole file, a missing file reads as empty text
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read
pub fn read_all(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Overwrite the file with `text`
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn write_all(path: &Path, text: &str) -> io::Result<()> {
    fs::write(path, text)
}

/// Value of the first `KEY=` line, quotes removed
#[must_use]
pub fn get(text: &str, key: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
        .map(parse_value)
}

/// Replace the first `KEY=` line in place or append `KEY="value"` when the key
/// is absent.
#[must_use]
pub fn upsert(text: &str, key: &str, value: &str) -> String {
    let entry = format_entry(key, value);
    let mut out = String::with_capacity(text.len() + entry.len() + 2);
    let mut replaced = false;

    for line in text.split_inclusive('\n') {
        if !replaced && line_matches(line, key) {
            out.push_str(&entry);
            out.push_str(line_ending(line));
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&entry);
        out.push('\n');
    }

    out
}

/// Copy the current value of `key` into `backup_key`, unless a backup already
/// exists. Returns the text unchanged when there is nothing to back up.
#[must_use]
pub fn backup(text: &str, key: &str, backup_key: &str) -> String {
    if get(text, backup_key).is_some() {
        return text.to_string();
    }
    match get(text, key) {
        Some(current) => upsert(text, backup_key, &current),
        None => text.to_string(),
    }
}

fn line_matches(line: &str, key: &str) -> bool {
    !key.is_empty()
        && line
            .strip_prefix(key)
            .is_some_and(|rest| rest.starts_with('='))
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

fn format_entry(key: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    format!("{key}=\"{escaped}\"")
}

fn parse_value(raw: &str) -> String {
    let raw = raw.trim();

    if let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return unescape(inner);
    }

    if let Some(inner) = raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return inner.to_string();
    }

    // unquoted values may carry a trailing comment
    raw.split_once(" #")
        .map_or(raw, |(value, _)| value)
        .trim_end()
        .to_string()
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// An env file loaded in memory, edited and written back in one go
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    text: String,
}

impl EnvFile {
    /// Load the file, a missing file starts empty
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let text = read_all(&path)?;
        Ok(Self { path, text })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        get(&self.text, key)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.text = upsert(&self.text, key, value);
    }

    /// Returns true if a backup entry was written
    pub fn backup(&mut self, key: &str, backup_key: &str) -> bool {
        let updated = backup(&self.text, key, backup_key);
        let changed = updated != self.text;
        self.text = updated;
        changed
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self) -> io::Result<()> {
        write_all(&self.path, &self.text)
    }
}
