use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DiaryError;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})_public\.md$").unwrap());

const FILENAME_SUFFIX: &str = "_public.md";

/// A validated `YYYY-MM-DD` calendar date identifying one diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryDate(NaiveDate);

impl EntryDate {
    /// Parse a date string, rejecting anything that is not a real calendar
    /// date in `YYYY-MM-DD` form.
    pub fn parse(value: &str) -> Result<Self, DiaryError> {
        if !DATE_RE.is_match(value) {
            return Err(DiaryError::InvalidInput(format!(
                "invalid date '{value}': date must be in YYYY-MM-DD format"
            )));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DiaryError::InvalidInput(format!("invalid date '{value}': not a calendar date")))
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// `2025-01-01` -> `2025-01-01_public.md`
    pub fn filename(&self) -> String {
        format!("{self}{FILENAME_SUFFIX}")
    }

    /// Extract the date from a diary filename; `None` for anything else.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let caps = FILENAME_RE.captures(filename)?;
        Self::parse(&caps[1]).ok()
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for EntryDate {
    type Err = DiaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EntryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
