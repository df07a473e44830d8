use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::client::{ensure_authenticated, ClientState, CompassApi};
use crate::error::{ClientError, Result};
use crate::fixtures::{self, FixtureSet};
use crate::models::RawRecord;
use crate::range::DateRange;

/// Stand-in for [`crate::CompassClient`] that serves fixture data.
///
/// Login always succeeds and never touches the network. Data calls keep the
/// login precondition and the date filtering of the real client.
#[derive(Debug)]
pub struct MockCompassClient {
    base_url: String,
    data_dir: PathBuf,
    fixtures: Option<FixtureSet>,
    state: ClientState,
}

impl MockCompassClient {
    /// Credentials are accepted for parity with the real client and ignored.
    pub fn new(base_url: &str, _username: &str, _password: &str) -> Self {
        Self::with_data_dir(base_url, fixtures::default_dir())
    }

    /// Serve fixtures from `data_dir` instead of the ones shipped with the crate.
    pub fn with_data_dir(base_url: &str, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            data_dir: data_dir.into(),
            fixtures: None,
            state: ClientState::Created,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Id of the fixture user, known after login.
    pub fn user_id(&self) -> Option<i64> {
        self.fixtures
            .as_ref()
            .and_then(|fixtures| fixtures.user.get("userId"))
            .and_then(|id| id.as_i64())
    }

    fn fixtures(&self) -> Result<&FixtureSet> {
        ensure_authenticated(self.state)?;
        self.fixtures.as_ref().ok_or(ClientError::NotAuthenticated)
    }
}

impl CompassApi for MockCompassClient {
    fn state(&self) -> ClientState {
        self.state
    }

    fn login(&mut self) -> Result<bool> {
        let fixtures = FixtureSet::load_or_synthetic(&self.data_dir);
        info!(
            version = %fixtures.schema_version.version,
            events = fixtures.events.len(),
            "mock login"
        );

        self.fixtures = Some(fixtures);
        self.state = ClientState::Authenticated;
        Ok(true)
    }

    fn user_details(&self, target_user_id: Option<i64>) -> Result<RawRecord> {
        let fixtures = self.fixtures()?;
        if let Some(target) = target_user_id {
            debug!(target, "mock client ignores the target user id");
        }
        Ok(fixtures.user.clone())
    }

    fn calendar_events(
        &self,
        start_date: &str,
        end_date: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        let fixtures = self.fixtures()?;
        let range = DateRange::parse(start_date, end_date)?;
        Ok(range.filter(fixtures.events.clone(), limit))
    }

    fn close(&mut self) {
        self.fixtures = None;
        self.state = ClientState::Closed;
    }
}
