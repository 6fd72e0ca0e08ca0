use chrono::{Datelike, NaiveDate};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateKeyError {
    #[error("malformed date key: {0:?} (expected YYYY-MM-DD)")]
    Malformed(String),
    #[error("malformed month key: {0:?} (expected YYYY-MM)")]
    MalformedMonth(String),
    #[error("no such calendar date: {0}")]
    OutOfRange(String),
}

pub fn encode(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn decode(key: &str) -> Result<NaiveDate, DateKeyError> {
    let malformed = || DateKeyError::Malformed(key.to_string());
    // Split from the right so a leading minus on the year stays with the year.
    let mut parts = key.rsplitn(3, '-');
    let day = parse_component::<u32>(parts.next()).ok_or_else(malformed)?;
    let month = parse_component::<u32>(parts.next()).ok_or_else(malformed)?;
    let year = parse_component::<i32>(parts.next()).ok_or_else(malformed)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateKeyError::OutOfRange(key.into()))
}

/// Parses a `YYYY-MM` key into a year and a 1-based month.
pub fn decode_month(key: &str) -> Result<(i32, u32), DateKeyError> {
    let malformed = || DateKeyError::MalformedMonth(key.to_string());
    let mut parts = key.rsplitn(2, '-');
    let month = parse_component::<u32>(parts.next()).ok_or_else(malformed)?;
    let year = parse_component::<i32>(parts.next()).ok_or_else(malformed)?;
    if !(1..=12).contains(&month) {
        return Err(DateKeyError::OutOfRange(key.into()));
    }
    Ok((year, month))
}

fn parse_component<T: std::str::FromStr>(part: Option<&str>) -> Option<T> {
    let raw = part?;
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Serde adapter storing a `NaiveDate` as its date key.
pub mod as_key {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode(&raw).map_err(D::Error::custom)
    }
}
