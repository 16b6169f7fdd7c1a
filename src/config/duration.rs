//! Human duration parsing.
//!
//! Accepts a bare number of seconds (`90`) or one or more
//! `<number><unit>` groups (`500ms`, `30s`, `5m`, `1h30m`, `2d`).

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:ms|s|m|h|d))+$").unwrap());

static PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(ms|s|m|h|d)").unwrap());

/// Parse a duration string.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    if !DURATION_REGEX.is_match(&text) {
        return Err(format!("invalid duration '{}'", input));
    }

    let mut total = Duration::ZERO;
    for caps in PART_REGEX.captures_iter(&text) {
        let value: u64 = caps[1]
            .parse()
            .map_err(|_| format!("duration value too large in '{}'", input))?;
        let part = match &caps[2] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "d" => Duration::from_secs(value.saturating_mul(86_400)),
            _ => unreachable!("unit restricted by regex"),
        };
        total = total.saturating_add(part);
    }

    Ok(total)
}

/// YAML may write durations as integers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

/// `deserialize_with` helper for `Option<Duration>` fields.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDuration>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawDuration::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn single_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn combined_units() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn deserializes_int_and_string() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "deserialize_opt")]
            timeout: Option<Duration>,
        }

        let h: Holder = serde_yaml::from_str("timeout: 12").unwrap();
        assert_eq!(h.timeout, Some(Duration::from_secs(12)));

        let h: Holder = serde_yaml::from_str("timeout: 2m").unwrap();
        assert_eq!(h.timeout, Some(Duration::from_secs(120)));

        let h: Holder = serde_yaml::from_str("{}").unwrap();
        assert_eq!(h.timeout, None);

        assert!(serde_yaml::from_str::<Holder>("timeout: later").is_err());
    }
}
