//! Run stamps in `YYYYMMDD-HHMMSS` form.
//!
//! Every stamp is exactly [`STAMP_LEN`] ASCII characters with zero-padded
//! fields, so lexical order of stamps (and of file names that start with one)
//! equals chronological order. Construction rejects anything that would break
//! that, such as years beyond 9999.

use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
pub const STAMP_LEN: usize = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("'{0}' is not a YYYYMMDD-HHMMSS stamp")]
    Malformed(String),

    #[error("{0} cannot be written as a fixed-width stamp")]
    OutOfRange(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    /// Stamp for the current local wall-clock time.
    pub fn now() -> Result<Self, TimestampError> {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(at: NaiveDateTime) -> Result<Self, TimestampError> {
        let stamp = at.format(STAMP_FORMAT).to_string();
        if !is_fixed_width(&stamp) {
            return Err(TimestampError::OutOfRange(at));
        }
        Ok(Self(stamp))
    }

    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        if !is_fixed_width(raw) || NaiveDateTime::parse_from_str(raw, STAMP_FORMAT).is_err() {
            return Err(TimestampError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Extract the stamp from the tail of a file stem such as
    /// `experiment-20230601-120000`.
    pub fn from_stem_suffix(stem: &str) -> Option<Self> {
        let start = stem.len().checked_sub(STAMP_LEN)?;
        stem.get(start..).and_then(|tail| Self::parse(tail).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_datetime(&self) -> NaiveDateTime {
        // Validated on construction.
        NaiveDateTime::parse_from_str(&self.0, STAMP_FORMAT).unwrap_or_default()
    }
}

fn is_fixed_width(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == STAMP_LEN
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}
