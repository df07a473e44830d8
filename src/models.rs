use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::datetime::{self, Timestamp};
use crate::error::ValidationIssue;

/// A record exactly as the API returns it, before validation.
pub type RawRecord = Map<String, Value>;

/// A domain model the parser can produce from a [`RawRecord`].
pub trait Record: Serialize + DeserializeOwned {
    /// Name used in parse error messages.
    const MODEL: &'static str;

    /// Invariants that go beyond field types.
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        Ok(())
    }
}

// Compass sends `null` for empty collections as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub location_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering_location_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering_location_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub manager_user_id: i64,
    /// Identifier the school imported the staff member with, usually an email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_import_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering_import_identifier: Option<String>,
}

/// One entry of a user's Compass calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub activity_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<i64>,
    pub title: String,
    /// Title with the rendered start time in front, e.g. `09:00 - Excursion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_title_without_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "datetime")]
    pub start: Timestamp,
    #[serde(with = "datetime")]
    pub finish: Timestamp,
    pub all_day: bool,
    /// Free-text location used by older calendar entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub managers: Vec<Manager>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_student_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_status: Option<i64>,
}

impl CalendarEvent {
    /// Calendar date the event starts on, in the event's own offset.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn finish_date(&self) -> NaiveDate {
        self.finish.date_naive()
    }

    /// Names of all structured locations, falling back to the free-text one.
    pub fn location_names(&self) -> Vec<&str> {
        let names: Vec<&str> = self
            .locations
            .iter()
            .filter_map(|location| location.location_name.as_deref())
            .collect();

        if names.is_empty() {
            self.location.as_deref().into_iter().collect()
        } else {
            names
        }
    }
}

impl Record for CalendarEvent {
    const MODEL: &'static str = "CalendarEvent";

    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let ordered = if self.all_day {
            self.finish_date() >= self.start_date()
        } else {
            self.finish >= self.start
        };

        if ordered {
            Ok(())
        } else {
            Err(vec![ValidationIssue::new(
                "finish",
                format!(
                    "finish {} precedes start {}",
                    datetime::format_timestamp(&self.finish),
                    datetime::format_timestamp(&self.start)
                ),
            )])
        }
    }
}

/// Profile of a Compass user (student, parent or staff).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarUser {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub user_id: i64,
    pub user_full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// School-issued code shown next to the name, e.g. `JSM-0001`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_display_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_compass_person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_year_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_form_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_house: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(
        default,
        with = "datetime::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub birthday: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_square_photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_school_id: Option<String>,
    #[serde(
        rename = "userSchoolURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_school_url: Option<String>,
}

impl Record for CalendarUser {
    const MODEL: &'static str = "CalendarUser";

    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        if self.user_full_name.trim().is_empty() {
            return Err(vec![ValidationIssue::new(
                "userFullName",
                "full name must not be blank",
            )]);
        }
        Ok(())
    }
}
