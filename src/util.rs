//! Environment helpers
//!
//! Absent variables fall back to the given default. Present but
//! unparsable values also fall back, with a warning, so a typo in a
//! deployment manifest never keeps a node from reporting.

use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

/// Non-empty value of `key`, trimmed
pub fn env_string(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a raw setting named `key`, warning about invalid values
pub fn parse_setting<T>(key: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = non_empty(raw)?;
    raw.parse()
        .inspect_err(|e| warn!("ignoring invalid {key}={raw:?}: {e}"))
        .ok()
}

/// Boolean counterpart of [`parse_setting`]
pub fn parse_flag(key: &str, raw: Option<String>) -> Option<bool> {
    let raw = non_empty(raw)?;
    let flag = parse_bool(&raw);
    if flag.is_none() {
        warn!("ignoring invalid {key}={raw:?}: expected a boolean");
    }
    flag
}

/// Lenient boolean parsing: `true/false`, `1/0`, `yes/no`, `on/off`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
