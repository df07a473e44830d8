//! Client for the Compass school information system.
//!
//! ```no_run
//! use compass_client::{create_client, parser, CalendarEvent, ClientOptions, CompassApi};
//!
//! let options = ClientOptions::from_env();
//! let mut client = create_client("https://school.compass.education", "user", "pass", None, &options)?;
//! client.login()?;
//!
//! let raw = client.calendar_events("2025-12-01", "2025-12-31", 100)?;
//! let (_events, _errors) = parser::parse_safe::<CalendarEvent>(&raw, true);
//! client.close();
//! # Ok::<(), compass_client::ClientError>(())
//! ```

mod client;
mod config;
mod datetime;
mod error;
mod factory;
mod mock;
mod models;

pub mod fixtures;
pub mod ics;
pub mod parser;
pub mod range;
pub mod session;

pub use client::{ClientState, CompassApi, CompassClient, DEFAULT_TIMEOUT};
pub use config::{ClientOptions, Credentials};
pub use datetime::Timestamp;
pub use error::{ClientError, ParseError, Result, ValidationIssue};
pub use factory::{create_client, resolve_mode, Mode};
pub use mock::MockCompassClient;
pub use models::{CalendarEvent, CalendarUser, Location, Manager, RawRecord, Record};
