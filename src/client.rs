use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::models::RawRecord;
use crate::range::DateRange;
use crate::session::{self, SessionMetadata};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

const LOGIN_PATH: &str = "/login.aspx?sessionstate=disabled";
const HOME_PATH: &str = "/home.aspx";
const USER_DETAILS_PATH: &str = "/Services/User.svc/GetUserDetailsBlobByUserId";
const CALENDAR_EVENTS_PATH: &str =
    "/Services/Calendar.svc/GetCalendarEventsByUser?sessionstate=readonly&ExcludeNonRelevantPd=true";

/// Lifecycle shared by every [`CompassApi`] implementation.
///
/// `Created -> Authenticated` on a successful login, any state `-> Closed`
/// on close. Using a client after closing it is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Created,
    Authenticated,
    Closed,
}

/// Operations every Compass client offers, network-backed or not.
///
/// Data calls return the raw wire records; feed them through
/// [`crate::parser`] to get domain models.
pub trait CompassApi: fmt::Debug + Send {
    fn state(&self) -> ClientState;

    fn login(&mut self) -> Result<bool>;

    /// Details of `target_user_id`, or of the logged-in user when `None`.
    fn user_details(&self, target_user_id: Option<i64>) -> Result<RawRecord>;

    /// Events overlapping the inclusive `YYYY-MM-DD` range, at most `limit`.
    fn calendar_events(&self, start_date: &str, end_date: &str, limit: usize)
        -> Result<Vec<RawRecord>>;

    /// Release resources. Safe to call more than once.
    fn close(&mut self);
}

pub(crate) fn ensure_authenticated(state: ClientState) -> Result<()> {
    match state {
        ClientState::Authenticated => Ok(()),
        ClientState::Created | ClientState::Closed => Err(ClientError::NotAuthenticated),
    }
}

/// Unwrap the `{"d": ...}` envelope WCF services put around their payloads.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("d") => map.remove("d").unwrap_or(Value::Null),
        other => other,
    }
}

fn into_record(endpoint: &'static str, value: Value) -> Result<RawRecord> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::UnexpectedResponse {
            endpoint,
            detail: format!("expected a JSON object, got {}", kind_of(&other)),
        }),
    }
}

fn into_records(endpoint: &'static str, value: Value) -> Result<Vec<RawRecord>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| into_record(endpoint, item))
            .collect(),
        other => Err(ClientError::UnexpectedResponse {
            endpoint,
            detail: format!("expected a JSON array, got {}", kind_of(&other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Client for a live Compass instance.
///
/// Holds one cookie-carrying HTTP session. Not meant to be shared between
/// threads without outside synchronisation.
pub struct CompassClient {
    base_url: String,
    username: String,
    password: String,
    http: Option<Client>,
    metadata: SessionMetadata,
    state: ClientState,
}

impl fmt::Debug for CompassClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompassClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("metadata", &self.metadata)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CompassClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::with_timeout(base_url, username, password, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .map_err(ClientError::request("failed to build HTTP client"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http: Some(http),
            metadata: SessionMetadata::default(),
            state: ClientState::Created,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Id of the logged-in user, known after a successful login.
    pub fn user_id(&self) -> Option<i64> {
        self.metadata.user_id
    }

    pub fn school_config_key(&self) -> Option<&str> {
        self.metadata.school_config_key.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn http(&self) -> Result<&Client> {
        self.http.as_ref().ok_or(ClientError::NotAuthenticated)
    }

    fn fetch_page(&self, url: &str, context: &'static str) -> Result<Response> {
        debug!(%url, "GET");
        self.http()?
            .get(url)
            .send()
            .and_then(Response::error_for_status)
            .map_err(ClientError::request(context))
    }

    fn post_json(&self, endpoint: &'static str, path: &str, payload: &Value) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "POST");

        let response = self
            .http()?
            .post(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .json(payload)
            .send()
            .and_then(Response::error_for_status)
            .map_err(ClientError::request(endpoint))?;

        debug!(%url, status = %response.status(), "received response");

        let body = response
            .text()
            .map_err(ClientError::request(endpoint))?;

        serde_json::from_str(&body)
            .map(unwrap_envelope)
            .map_err(|err| ClientError::UnexpectedResponse {
                endpoint,
                detail: format!("invalid JSON: {err}"),
            })
    }

    fn session_user_id(&self) -> Result<i64> {
        self.metadata.user_id.ok_or(ClientError::NotAuthenticated)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-AU,en;q=0.9"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

impl CompassApi for CompassClient {
    fn state(&self) -> ClientState {
        self.state
    }

    fn login(&mut self) -> Result<bool> {
        let login_url = self.url(LOGIN_PATH);
        info!(url = %login_url, "logging in to Compass");

        let login_page = self
            .fetch_page(&login_url, "login page request failed")?
            .text()
            .map_err(ClientError::request("login page request failed"))?;

        let form = session::login_form(&login_page, &self.username, &self.password);

        let response = self
            .http()?
            .post(&login_url)
            .header(header::REFERER, login_url.as_str())
            .header(header::ORIGIN, self.base_url.as_str())
            .form(&form)
            .send()
            .and_then(Response::error_for_status)
            .map_err(ClientError::request("login request failed"))?;

        let landed_on = response.url().to_string();
        if landed_on.to_lowercase().contains("login.aspx") {
            return Err(ClientError::Authentication(
                "invalid credentials or server error".into(),
            ));
        }

        let body = response
            .text()
            .map_err(ClientError::request("login request failed"))?;
        let mut metadata = SessionMetadata::extract(&body);

        if metadata.user_id.is_none() {
            debug!(%landed_on, "no session metadata after login, trying home page");
            let home = self
                .fetch_page(&self.url(HOME_PATH), "home page request failed")?
                .text()
                .map_err(ClientError::request("home page request failed"))?;
            metadata.merge(SessionMetadata::extract(&home));
        }

        let Some(user_id) = metadata.user_id else {
            return Err(ClientError::Authentication(
                "could not find the user id of the Compass session".into(),
            ));
        };

        self.metadata = metadata;
        self.state = ClientState::Authenticated;
        info!(user_id, "logged in to Compass");
        Ok(true)
    }

    fn user_details(&self, target_user_id: Option<i64>) -> Result<RawRecord> {
        ensure_authenticated(self.state)?;

        let user_id = match target_user_id {
            Some(id) => id,
            None => self.session_user_id()?,
        };

        let body = self.post_json(
            "user details",
            USER_DETAILS_PATH,
            &json!({ "targetUserId": user_id }),
        )?;
        into_record("user details", body)
    }

    fn calendar_events(
        &self,
        start_date: &str,
        end_date: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        ensure_authenticated(self.state)?;

        let range = DateRange::parse(start_date, end_date)?;
        if range.is_inverted() || limit == 0 {
            return Ok(Vec::new());
        }

        let payload = json!({
            "userId": self.session_user_id()?,
            "homePage": true,
            "activityId": null,
            "locationId": null,
            "staffIds": null,
            "startDate": start_date,
            "endDate": end_date,
            "page": 1,
            "start": 0,
            "limit": limit,
        });

        let body = self.post_json("calendar events", CALENDAR_EVENTS_PATH, &payload)?;
        let events = into_records("calendar events", body)?;
        Ok(range.filter(events, limit))
    }

    fn close(&mut self) {
        if self.http.take().is_some() {
            debug!(base_url = %self.base_url, "closed Compass session");
        }
        self.state = ClientState::Closed;
    }
}
