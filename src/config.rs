use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::DEFAULT_TIMEOUT;

pub const MODE_VAR: &str = "COMPASS_MODE";
pub const MOCK_DATA_DIR_VAR: &str = "COMPASS_MOCK_DATA_DIR";
pub const TIMEOUT_VAR: &str = "COMPASS_TIMEOUT_SECS";
pub const BASE_URL_VAR: &str = "COMPASS_BASE_URL";
pub const USERNAME_VAR: &str = "COMPASS_USERNAME";
pub const PASSWORD_VAR: &str = "COMPASS_PASSWORD";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Settings the factory needs beyond the credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Mode used when the caller passes none explicitly.
    pub configured_mode: Option<String>,
    /// Fixture directory for the mock client.
    pub mock_data_dir: Option<PathBuf>,
    /// Per-request timeout of the network client.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            configured_mode: None,
            mock_data_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientOptions {
    /// Read `COMPASS_MODE`, `COMPASS_MOCK_DATA_DIR` and `COMPASS_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout = non_blank(lookup(TIMEOUT_VAR))
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Self {
            configured_mode: non_blank(lookup(MODE_VAR)),
            mock_data_dir: non_blank(lookup(MOCK_DATA_DIR_VAR)).map(PathBuf::from),
            timeout,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.configured_mode = Some(mode.into());
        self
    }

    pub fn with_mock_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mock_data_dir = Some(dir.into());
        self
    }
}

/// Where and as whom to log in.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `COMPASS_BASE_URL`, `COMPASS_USERNAME` and `COMPASS_PASSWORD`.
    /// Missing values are left empty, which the mock client accepts.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup(BASE_URL_VAR).unwrap_or_default(),
            username: lookup(USERNAME_VAR).unwrap_or_default(),
            password: lookup(PASSWORD_VAR).unwrap_or_default(),
        }
    }
}
