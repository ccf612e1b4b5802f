use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::Score;

pub(crate) fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

pub(crate) fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_u64_any(v)?;
    u32::try_from(n).ok()
}

pub(crate) fn as_u8_any(v: &Value) -> Option<u8> {
    let n = as_u64_any(v)?;
    u8::try_from(n).ok()
}

pub(crate) fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|x| x.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// `{ "home": n, "away": n }`; `None` unless both sides are present.
pub(crate) fn score_pair(v: &Value) -> Option<Score> {
    let home = as_u8_any(v.get("home")?)?;
    let away = as_u8_any(v.get("away")?)?;
    Some(Score::new(home, away))
}

pub(crate) fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Accepts `12`, `"12"` and `"55%"`.
pub(crate) fn stat_value(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let raw = v.as_str()?.trim().trim_end_matches('%').trim();
    raw.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_pair_requires_both_sides() {
        assert_eq!(score_pair(&json!({"home": 2, "away": 1})), Some(Score::new(2, 1)));
        assert_eq!(score_pair(&json!({"home": 2, "away": null})), None);
        assert_eq!(score_pair(&json!({"home": "3", "away": "0"})), Some(Score::new(3, 0)));
    }

    #[test]
    fn stat_value_handles_percentages() {
        assert_eq!(stat_value(&json!("55%")), Some(55));
        assert_eq!(stat_value(&json!(7)), Some(7));
        assert_eq!(stat_value(&Value::Null), None);
    }

    #[test]
    fn kickoff_accepts_offset_and_zulu() {
        let a = parse_kickoff("2024-08-17T11:30:00+00:00").unwrap();
        let b = parse_kickoff("2024-08-17T11:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_kickoff("yesterday").is_none());
    }
}
