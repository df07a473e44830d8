//! Turns raw API records into validated domain models.
//!
//! The clients only ever hand out [`RawRecord`]s; this module is the single
//! place where the camelCase wire shape is mapped onto the snake_case models.
//! Unknown wire fields are ignored so schema additions on the Compass side
//! never break parsing.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ParseError, ValidationIssue};
use crate::models::{RawRecord, Record};

/// Result of [`parse_value`], mirroring the shape of the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Parsed<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Parsed::One(item) => vec![item],
            Parsed::Many(items) => items,
        }
    }
}

fn validate_value<T: Record>(raw: Value) -> Result<T, ParseError> {
    let record: T = match serde_json::from_value(raw.clone()) {
        Ok(record) => record,
        Err(err) => {
            return Err(ParseError::new(
                T::MODEL,
                raw,
                vec![ValidationIssue::new("$", err.to_string())],
            ))
        }
    };

    record
        .validate()
        .map(|()| record)
        .map_err(|issues| ParseError::new(T::MODEL, raw, issues))
}

/// Parse a single record, failing with the record and its issues attached.
pub fn parse<T: Record>(raw: &RawRecord) -> Result<T, ParseError> {
    validate_value(Value::Object(raw.clone()))
}

/// Parse every record, stopping at the first invalid one.
pub fn parse_list<T: Record>(raw: &[RawRecord]) -> Result<Vec<T>, ParseError> {
    raw.iter()
        .enumerate()
        .map(|(idx, item)| parse(item).map_err(|err| err.at_index(idx)))
        .collect()
}

/// Parse either a single object or an array of objects.
pub fn parse_value<T: Record>(raw: &Value) -> Result<Parsed<T>, ParseError> {
    match raw {
        Value::Object(record) => parse(record).map(Parsed::One),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let parsed = match item {
                    Value::Object(record) => parse(record),
                    other => Err(not_an_object::<T>(other)),
                };
                parsed.map_err(|err| err.at_index(idx))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Parsed::Many),
        other => Err(not_an_object::<T>(other)),
    }
}

fn not_an_object<T: Record>(raw: &Value) -> ParseError {
    ParseError::new(
        T::MODEL,
        raw.clone(),
        vec![ValidationIssue::new("$", "expected a JSON object")],
    )
}

/// Parse a list without ever failing.
///
/// Returns every valid record in its original order together with one
/// [`ParseError`] per rejected record. Both modes parse the whole list;
/// `skip_invalid` only decides whether rejections are logged as routine
/// (`debug`) or as problems worth a look (`warn`).
pub fn parse_safe<T: Record>(raw: &[RawRecord], skip_invalid: bool) -> (Vec<T>, Vec<ParseError>) {
    let mut valid = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for (idx, item) in raw.iter().enumerate() {
        match parse(item) {
            Ok(record) => valid.push(record),
            Err(err) => {
                let err = err.at_index(idx);
                if skip_invalid {
                    debug!(error = %err, "skipping invalid record");
                } else {
                    warn!(error = %err, "invalid record");
                }
                errors.push(err);
            }
        }
    }

    (valid, errors)
}

/// Render a model back into its wire shape.
pub fn to_raw<T: Record>(record: &T) -> serde_json::Result<RawRecord> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(serde::ser::Error::custom(format!(
            "{} did not serialize to a JSON object",
            T::MODEL
        ))),
    }
}
