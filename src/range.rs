use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::datetime::parse_timestamp;
use crate::error::{ClientError, Result};
use crate::models::RawRecord;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    // chrono accepts unpadded, signed and space-padded fields, the API does not
    let well_formed = value.len() == 10
        && value.bytes().enumerate().all(|(idx, byte)| match idx {
            4 | 7 => byte == b'-',
            _ => byte.is_ascii_digit(),
        });

    well_formed
        .then(|| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
        .flatten()
        .ok_or_else(|| ClientError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// Inclusive range of calendar days a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_date("start date", start)?,
            end: parse_date("end date", end)?,
        })
    }

    /// `start` after `end`: a valid query that can never match anything.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn intersects(&self, first: NaiveDate, last: NaiveDate) -> bool {
        !self.is_inverted() && first <= self.end && last >= self.start
    }

    /// Whether a raw event overlaps the range, or `None` if its dates are unreadable.
    fn covers(&self, event: &RawRecord) -> Option<bool> {
        let date_of = |key: &str| {
            event
                .get(key)
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
                .map(|ts| ts.date_naive())
        };

        let first = date_of("start")?;
        let last = date_of("finish").unwrap_or(first);
        Some(self.intersects(first, last))
    }

    /// Keep the events overlapping the range, at most `limit` of them.
    ///
    /// Events whose start cannot be read never match any range.
    pub fn filter(&self, events: Vec<RawRecord>, limit: usize) -> Vec<RawRecord> {
        if self.is_inverted() {
            return Vec::new();
        }

        let total = events.len();
        let kept: Vec<RawRecord> = events
            .into_iter()
            .filter(|event| self.covers(event).unwrap_or(false))
            .take(limit)
            .collect();

        debug!(total, kept = kept.len(), limit, "filtered calendar events");
        kept
    }
}
