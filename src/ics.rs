use chrono::{Duration, Utc};
use ics::parameters::Value;
use ics::properties::{Description, DtEnd, DtStart, Location, Summary};
use ics::ICalendar;

use crate::models::CalendarEvent;

/// Render parsed events as an iCalendar feed.
#[must_use]
pub fn calendar<'a>(name: &'a str, events: &'a [CalendarEvent]) -> ICalendar<'a> {
    let mut icalendar = ICalendar::new("2.0", name);

    for event in events {
        icalendar.add_event(event.to_ics());
    }

    icalendar
}

impl CalendarEvent {
    fn ics_uid(&self) -> String {
        self.guid
            .clone()
            .or_else(|| self.instance_id.clone())
            .unwrap_or_else(|| format!("{}-{}", self.activity_id, self.start.timestamp()))
    }

    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let stamp = self.start.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string();
        let mut ics_event = ics::Event::new(self.ics_uid(), stamp.clone());

        if self.all_day {
            // DTEND of a date-only event is exclusive
            let end = self.finish_date() + Duration::days(1);

            let mut start = DtStart::new(self.start_date().format("%Y%m%d").to_string());
            start.add(Value::DATE);
            let mut end = DtEnd::new(end.format("%Y%m%d").to_string());
            end.add(Value::DATE);

            ics_event.push(start);
            ics_event.push(end);
        } else {
            let end = self.finish.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string();
            ics_event.push(DtStart::new(stamp));
            ics_event.push(DtEnd::new(end));
        }

        ics_event.push(Summary::new(self.title.as_str()));

        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            ics_event.push(Description::new(description));
        }

        let locations = self.location_names();
        if !locations.is_empty() {
            ics_event.push(Location::new(locations.join(", ")));
        }

        ics_event
    }
}
