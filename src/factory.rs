use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::client::{CompassApi, CompassClient};
use crate::config::ClientOptions;
use crate::error::{ClientError, Result};
use crate::fixtures;
use crate::mock::MockCompassClient;

/// Which client implementation the factory builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Real,
    Mock,
}

impl FromStr for Mode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "real" => Ok(Mode::Real),
            "mock" => Ok(Mode::Mock),
            _ => Err(ClientError::InvalidMode(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Real => "real",
            Mode::Mock => "mock",
        })
    }
}

/// Pick the effective mode: explicit argument, then configuration, then `real`.
///
/// Blank strings count as not given.
pub fn resolve_mode(explicit: Option<&str>, configured: Option<&str>) -> Result<Mode> {
    explicit
        .into_iter()
        .chain(configured)
        .find(|mode| !mode.trim().is_empty())
        .map_or(Ok(Mode::default()), str::parse)
}

/// Build a client that has not logged in yet.
pub fn create_client(
    base_url: &str,
    username: &str,
    password: &str,
    mode: Option<&str>,
    options: &ClientOptions,
) -> Result<Box<dyn CompassApi>> {
    let mode = resolve_mode(mode, options.configured_mode.as_deref())?;
    debug!(%mode, base_url, "creating Compass client");

    Ok(match mode {
        Mode::Real => Box::new(CompassClient::with_timeout(
            base_url,
            username,
            password,
            options.timeout,
        )?),
        Mode::Mock => Box::new(MockCompassClient::with_data_dir(
            base_url,
            options
                .mock_data_dir
                .clone()
                .unwrap_or_else(fixtures::default_dir),
        )),
    })
}
