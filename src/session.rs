//! Scraping of the Compass login page and the pages served after login.
//!
//! Nothing here touches the network, so every function can be exercised
//! against saved HTML.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

macro_rules! regex {
    ($pattern:expr) => {{
        static REGEX: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
        &REGEX
    }};
}

/// Values embedded in page scripts that identify the logged-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub user_id: Option<i64>,
    pub school_config_key: Option<String>,
}

impl SessionMetadata {
    /// Scan a response body for `organisationUserId` and `schoolConfigKey` assignments.
    pub fn extract(body: &str) -> Self {
        let user_id = regex!(r#"organisationUserId["']?\s*[:=]\s*(\d+)"#)
            .captures(body)
            .and_then(|caps| caps[1].parse().ok());

        let school_config_key = regex!(r#"schoolConfigKey["']?\s*[:=]\s*["']([^"']+)["']"#)
            .captures(body)
            .map(|caps| caps[1].to_string());

        Self {
            user_id,
            school_config_key,
        }
    }

    /// Fill in whatever `self` is missing from `other`.
    pub fn merge(&mut self, other: SessionMetadata) {
        if self.user_id.is_none() {
            self.user_id = other.user_id;
        }
        if self.school_config_key.is_none() {
            self.school_config_key = other.school_config_key;
        }
    }
}

/// Collect the inputs of the first form on the page, hidden ASP.NET state included.
pub fn extract_form_fields(html: &str) -> BTreeMap<String, String> {
    let html = Html::parse_document(html);
    let mut fields = BTreeMap::new();

    if let Some(form) = html.select(selector!("form")).next() {
        for input in form.select(selector!("input")) {
            let element = input.value();
            if let Some(name) = element.attr("name").filter(|name| !name.is_empty()) {
                fields.insert(
                    name.to_string(),
                    element.attr("value").unwrap_or_default().to_string(),
                );
            }
        }
    }

    fields
}

/// Form body for the credential post: the scraped fields plus the login inputs.
pub fn login_form(
    login_page: &str,
    username: &str,
    password: &str,
) -> BTreeMap<String, String> {
    let mut form = extract_form_fields(login_page);

    form.entry("__EVENTTARGET".into())
        .or_insert_with(|| "button1".into());
    form.entry("__EVENTARGUMENT".into()).or_default();

    form.insert("username".into(), username.into());
    form.insert("password".into(), password.into());
    form.insert("rememberMeChk".into(), "on".into());

    form
}
