//! Committed sample data backing the mock client.
//!
//! A fixture directory holds `compass_events.json` (array of raw events),
//! `compass_user.json` (one raw user) and `schema_version.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::RawRecord;

pub const EVENTS_FILE: &str = "compass_events.json";
pub const USER_FILE: &str = "compass_user.json";
pub const SCHEMA_VERSION_FILE: &str = "schema_version.json";

const REQUIRED_EVENT_FIELDS: [&str; 3] = ["start", "finish", "title"];
const REQUIRED_USER_FIELDS: [&str; 3] = ["userId", "userFirstName", "userLastName"];

/// Fixture directory shipped with the crate.
pub fn default_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("mock")
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("mock data directory does not exist: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} must contain {expected}")]
    Shape {
        file: &'static str,
        expected: &'static str,
    },

    #[error("{file} is missing required fields: {}", missing.join(", "))]
    MissingFields {
        file: String,
        missing: Vec<&'static str>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub version: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    pub events: Vec<RawRecord>,
    pub user: RawRecord,
    pub schema_version: SchemaVersion,
}

fn read_json(dir: &Path, file: &str) -> Result<Value, FixtureError> {
    let path = dir.join(file);
    let contents = fs::read_to_string(&path).map_err(|source| FixtureError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| FixtureError::Json { path, source })
}

fn require_fields(
    file: String,
    record: &RawRecord,
    required: &[&'static str],
) -> Result<(), FixtureError> {
    let missing: Vec<&'static str> = required
        .iter()
        .copied()
        .filter(|field| !record.contains_key(*field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FixtureError::MissingFields { file, missing })
    }
}

fn load_events(dir: &Path) -> Result<Vec<RawRecord>, FixtureError> {
    let Value::Array(items) = read_json(dir, EVENTS_FILE)? else {
        return Err(FixtureError::Shape {
            file: EVENTS_FILE,
            expected: "a JSON array",
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(event) => {
                require_fields(format!("{EVENTS_FILE}[{idx}]"), &event, &REQUIRED_EVENT_FIELDS)?;
                Ok(event)
            }
            _ => Err(FixtureError::Shape {
                file: EVENTS_FILE,
                expected: "only JSON objects",
            }),
        })
        .collect()
}

fn load_user(dir: &Path) -> Result<RawRecord, FixtureError> {
    let Value::Object(user) = read_json(dir, USER_FILE)? else {
        return Err(FixtureError::Shape {
            file: USER_FILE,
            expected: "a JSON object",
        });
    };

    require_fields(USER_FILE.to_string(), &user, &REQUIRED_USER_FIELDS)?;
    Ok(user)
}

fn load_schema_version(dir: &Path) -> Result<SchemaVersion, FixtureError> {
    let Value::Object(version) = read_json(dir, SCHEMA_VERSION_FILE)? else {
        return Err(FixtureError::Shape {
            file: SCHEMA_VERSION_FILE,
            expected: "a JSON object",
        });
    };

    require_fields(
        SCHEMA_VERSION_FILE.to_string(),
        &version,
        &["version", "api_version"],
    )?;

    serde_json::from_value(Value::Object(version)).map_err(|source| FixtureError::Json {
        path: dir.join(SCHEMA_VERSION_FILE),
        source,
    })
}

impl FixtureSet {
    /// Load and check every fixture file in `dir`.
    pub fn load(dir: &Path) -> Result<Self, FixtureError> {
        if !dir.is_dir() {
            return Err(FixtureError::MissingDir(dir.to_path_buf()));
        }

        let fixtures = Self {
            events: load_events(dir)?,
            user: load_user(dir)?,
            schema_version: load_schema_version(dir)?,
        };

        debug!(
            dir = %dir.display(),
            events = fixtures.events.len(),
            version = %fixtures.schema_version.version,
            "loaded mock fixtures"
        );
        Ok(fixtures)
    }

    /// Like [`FixtureSet::load`], but falls back to [`FixtureSet::synthetic`].
    pub fn load_or_synthetic(dir: &Path) -> Self {
        Self::load(dir).unwrap_or_else(|err| {
            warn!(error = %err, "failed to load mock data, using synthetic records");
            Self::synthetic()
        })
    }

    /// A small hard-coded data set that needs no files.
    pub fn synthetic() -> Self {
        Self {
            events: synthetic_events(),
            user: synthetic_user(),
            schema_version: SchemaVersion {
                version: "synthetic".into(),
                api_version: "v1".into(),
                generated_at: None,
                notes: Some("built-in fallback records".into()),
            },
        }
    }
}

fn object(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

fn synthetic_event(
    id: i64,
    title: &str,
    time_prefix: Option<&str>,
    description: &str,
    (start, finish, all_day): (&str, &str, bool),
    color: &str,
    (location_name, manager_code): (&str, &str),
) -> RawRecord {
    let long_title = match time_prefix {
        Some(prefix) => format!("{prefix} - {title}"),
        None => title.to_string(),
    };

    object(json!({
        "__type": "CalendarTransport:http://jdlf.com.au/ns/data/calendar",
        "activityId": id,
        "activityType": 1,
        "allDay": all_day,
        "attendeeUserId": 12345,
        "backgroundColor": color,
        "calendarId": 1,
        "description": description,
        "finish": finish,
        "guid": format!("fallback-guid-{id:03}"),
        "instanceId": format!("fallback-instance-{id:03}"),
        "isRecurring": false,
        "longTitle": long_title,
        "longTitleWithoutTime": title,
        "managerId": 1000 + id,
        "runningStatus": 0,
        "start": start,
        "targetStudentId": 12345,
        "title": title,
        "locations": [{
            "__type": "CalendarEventLocation:http://jdlf.com.au/ns/data/calendar",
            "locationId": id,
            "locationName": location_name,
        }],
        "managers": [{
            "__type": "CalendarEventManager:http://jdlf.com.au/ns/data/calendar",
            "managerUserId": 1000 + id,
            "managerImportIdentifier": manager_code,
        }],
    }))
}

fn synthetic_events() -> Vec<RawRecord> {
    vec![
        synthetic_event(
            1,
            "Year 3 Excursion to Taronga Zoo",
            Some("09:00"),
            "Permission slip required. Cost: $25",
            ("2025-12-15T09:00:00+11:00", "2025-12-15T15:00:00+11:00", false),
            "#4CAF50",
            ("Taronga Zoo", "teacher1@school.edu"),
        ),
        synthetic_event(
            2,
            "Free Dress Day",
            None,
            "Wear your favourite outfit. Gold coin donation.",
            ("2025-12-18T00:00:00+11:00", "2025-12-18T23:59:59+11:00", true),
            "#FF9800",
            ("School", "admin@school.edu"),
        ),
        synthetic_event(
            3,
            "Year 3 Music Performance",
            Some("18:00"),
            "Evening performance. Tickets available online.",
            ("2025-12-20T18:00:00+11:00", "2025-12-20T19:00:00+11:00", false),
            "#2196F3",
            ("School Hall", "teacher2@school.edu"),
        ),
    ]
}

fn synthetic_user() -> RawRecord {
    object(json!({
        "__type": "UserDetailsBlob",
        "userId": 12345,
        "userFirstName": "Jane",
        "userLastName": "Smith",
        "userPreferredName": "Jane",
        "userFullName": "Jane Smith",
        "userEmail": "jane.smith@example.com",
        "userDisplayCode": "JSM-0001",
        "userCompassPersonId": "00000000-0000-4000-8000-000000012345",
        "userYearLevel": "8",
        "userFormGroup": "8A",
        "userHouse": "Blue House",
        "userRole": 4,
        "age": 13,
        "birthday": "2012-03-15T00:00:00+11:00",
        "gender": "Female",
        "userPhotoPath": "/images/default-avatar.png",
        "userSquarePhotoPath": "/images/default-avatar-square.png",
        "userSchoolId": "SCH001",
        "userSchoolURL": "https://school.compass.education",
    }))
}
