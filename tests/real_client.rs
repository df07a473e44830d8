//! `CompassClient` against a local stand-in for a Compass instance.
//!
//! The client is blocking, so every call runs on tokio's blocking pool while
//! the mock server keeps serving on the runtime.

use std::fs;

use compass_client::fixtures::{EVENTS_FILE, SCHEMA_VERSION_FILE, USER_FILE};
use compass_client::{ClientError, ClientState, CompassApi, CompassClient, MockCompassClient};
use serde_json::{json, Value};
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, header_regex, method, path,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PAGE: &str = r#"<html><body>
  <form method="post" action="./login.aspx?sessionstate=disabled" id="form1">
    <input type="hidden" name="__VIEWSTATE" value="dDwtMTA4NzE=" />
    <input type="hidden" name="__VIEWSTATEGENERATOR" value="C2EE9ABB" />
    <input type="text" name="username" />
    <input type="password" name="password" />
  </form>
</body></html>"#;

const HOME_PAGE: &str = r#"<html><head><script>
    Compass.organisationUserId = 4242;
    Compass.schoolConfigKey = 'a1b2-c3d4';
</script></head><body>Welcome</body></html>"#;

const SESSION_COOKIE: &str = r"ASP\.NET_SessionId=abc123";

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

/// Login page, a credential post that redirects to `/`, and the page behind it.
async fn mount_login(server: &MockServer, landing_page: &str) {
    Mock::given(method("GET"))
        .and(path("/login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login.aspx"))
        .and(body_string_contains("username=parent"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", "ASP.NET_SessionId=abc123; path=/; HttpOnly"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page))
        .mount(server)
        .await;
}

fn logged_in(base_url: &str) -> CompassClient {
    let mut client = CompassClient::new(base_url, "parent", "hunter2").expect("client builds");
    assert!(client.login().expect("login succeeds"));
    client
}

fn event(id: i64, start: &str, finish: &str) -> Value {
    json!({
        "__type": "CalendarTransport:http://jdlf.com.au/ns/data/calendar",
        "activityId": id,
        "title": format!("Event {id}"),
        "start": start,
        "finish": finish,
        "allDay": false,
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn login_reads_session_metadata() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    let uri = server.uri();
    let (state, user_id, key) = blocking(move || {
        let client = logged_in(&uri);
        (
            client.state(),
            client.user_id(),
            client.school_config_key().map(str::to_string),
        )
    })
    .await;

    assert_eq!(state, ClientState::Authenticated);
    assert_eq!(user_id, Some(4242));
    assert_eq!(key.as_deref(), Some("a1b2-c3d4"));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_posts_scraped_form_state() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login.aspx"))
        .and(body_string_contains("__VIEWSTATE=dDwtMTA4NzE%3D"))
        .and(body_string_contains("__EVENTTARGET=button1"))
        .and(body_string_contains("rememberMeChk=on"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, HOME_PAGE).await;

    let uri = server.uri();
    blocking(move || logged_in(&uri)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_stay_on_login_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (result, state) = blocking(move || {
        let mut client = CompassClient::new(&uri, "parent", "wrong").unwrap();
        let result = client.login();
        (result, client.state())
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_authentication(), "{err}");
    assert_eq!(state, ClientState::Created);
}

#[tokio::test(flavor = "multi_thread")]
async fn falls_back_to_home_page_for_metadata() {
    let server = MockServer::start().await;
    mount_login(&server, "<html><body>Loading...</body></html>").await;

    Mock::given(method("GET"))
        .and(path("/home.aspx"))
        .and(header_regex("cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let user_id = blocking(move || logged_in(&uri).user_id()).await;
    assert_eq!(user_id, Some(4242));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_user_id_fails_login() {
    let server = MockServer::start().await;
    mount_login(&server, "<html></html>").await;

    Mock::given(method("GET"))
        .and(path("/home.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = blocking(move || CompassClient::new(&uri, "parent", "hunter2").unwrap().login()).await;
    assert!(matches!(result, Err(ClientError::Authentication(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn user_details_unwraps_envelope() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/User.svc/GetUserDetailsBlobByUserId"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(header_regex("cookie", SESSION_COOKIE))
        .and(body_partial_json(json!({ "targetUserId": 4242 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": { "userId": 4242, "userFullName": "Jane Smith" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let user = blocking(move || logged_in(&uri).user_details(None)).await.unwrap();
    assert_eq!(user["userFullName"], "Jane Smith");
    assert!(!user.contains_key("d"));
}

#[tokio::test(flavor = "multi_thread")]
async fn user_details_for_another_user() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/User.svc/GetUserDetailsBlobByUserId"))
        .and(body_partial_json(json!({ "targetUserId": 77 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": { "userId": 77, "userFullName": "Sam Smith" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let user = blocking(move || logged_in(&uri).user_details(Some(77))).await.unwrap();
    assert_eq!(user["userId"], 77);
}

#[tokio::test(flavor = "multi_thread")]
async fn calendar_events_are_filtered_and_limited() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/Calendar.svc/GetCalendarEventsByUser"))
        .and(header_regex("cookie", SESSION_COOKIE))
        .and(body_partial_json(json!({
            "userId": 4242,
            "startDate": "2025-12-01",
            "endDate": "2025-12-31",
            "limit": 2,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": [
                event(1, "2025-11-20T09:00:00+11:00", "2025-11-20T10:00:00+11:00"),
                event(2, "2025-11-30T09:00:00+11:00", "2025-12-01T10:00:00+11:00"),
                event(3, "2025-12-15T09:00:00+11:00", "2025-12-15T10:00:00+11:00"),
                event(4, "2025-12-20T09:00:00+11:00", "2025-12-20T10:00:00+11:00"),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let events = blocking(move || logged_in(&uri).calendar_events("2025-12-01", "2025-12-31", 2))
        .await
        .unwrap();

    let ids: Vec<_> = events.iter().map(|event| event["activityId"].clone()).collect();
    assert_eq!(ids, vec![json!(2), json!(3)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unwrapped_event_list_is_accepted() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/Calendar.svc/GetCalendarEventsByUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event(1, "2025-12-02T09:00:00Z", "2025-12-02T10:00:00Z"),
        ])))
        .mount(&server)
        .await;

    let uri = server.uri();
    let events = blocking(move || logged_in(&uri).calendar_events("2025-12-01", "2025-12-31", 10))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_ranges_never_reach_the_server() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/Calendar.svc/GetCalendarEventsByUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "d": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (inverted, malformed, zero) = blocking(move || {
        let client = logged_in(&uri);
        (
            client.calendar_events("2025-12-31", "2025-12-01", 10),
            client.calendar_events("2025-12-1", "2025-12-31", 10),
            client.calendar_events("2025-12-01", "2025-12-31", 0),
        )
    })
    .await;

    assert!(inverted.unwrap().is_empty());
    assert!(matches!(
        malformed,
        Err(ClientError::InvalidDate { field: "start date", .. })
    ));
    assert!(zero.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_surface_as_request_errors() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/Services/Calendar.svc/GetCalendarEventsByUser"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Services/User.svc/GetUserDetailsBlobByUserId"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (events, user) = blocking(move || {
        let client = logged_in(&uri);
        (
            client.calendar_events("2025-12-01", "2025-12-31", 10),
            client.user_details(None),
        )
    })
    .await;

    assert!(matches!(events, Err(ClientError::Request { .. })));
    assert!(matches!(user, Err(ClientError::UnexpectedResponse { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server() {
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let result = blocking(move || CompassClient::new(&uri, "parent", "hunter2").unwrap().login()).await;
    assert!(matches!(result, Err(ClientError::Request { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_client_refuses_data_calls() {
    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;

    let uri = server.uri();
    let (state, result) = blocking(move || {
        let mut client = logged_in(&uri);
        client.close();
        client.close();
        (client.state(), client.calendar_events("2025-12-01", "2025-12-31", 10))
    })
    .await;

    assert_eq!(state, ClientState::Closed);
    assert!(matches!(result, Err(ClientError::NotAuthenticated)));
}

fn ids(events: &[compass_client::RawRecord]) -> Vec<Value> {
    events.iter().map(|event| event["activityId"].clone()).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn real_and_mock_clients_filter_alike() {
    let records = json!([
        event(1, "2025-11-20T09:00:00+11:00", "2025-11-20T10:00:00+11:00"),
        event(2, "2025-11-30T09:00:00+11:00", "2025-12-01T10:00:00+11:00"),
        event(3, "2025-12-10T09:00:00+11:00", "2025-12-10T10:00:00+11:00"),
        event(4, "TBA", "2025-12-10T10:00:00+11:00"),
        event(5, "2025-12-31T23:00:00+11:00", "2026-01-01T01:00:00+11:00"),
        event(6, "2025-12-09T00:00:00+11:00", "2025-12-11T23:59:59+11:00"),
        event(7, "2026-01-01T09:00:00+11:00", "2026-01-01T10:00:00+11:00"),
    ]);

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(EVENTS_FILE), records.to_string()).unwrap();
    fs::write(
        dir.path().join(USER_FILE),
        json!({
            "userId": 4242,
            "userFirstName": "Jane",
            "userLastName": "Smith",
            "userFullName": "Jane Smith",
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        dir.path().join(SCHEMA_VERSION_FILE),
        json!({ "version": "1.0.0", "api_version": "v1" }).to_string(),
    )
    .unwrap();

    let server = MockServer::start().await;
    mount_login(&server, HOME_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/Services/Calendar.svc/GetCalendarEventsByUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "d": records })))
        .mount(&server)
        .await;

    let queries = [
        ("2025-12-01", "2025-12-31", 10, vec![2, 3, 5, 6]),
        ("2025-12-01", "2025-12-31", 2, vec![2, 3]),
        ("2025-12-10", "2025-12-10", 10, vec![3, 6]),
        ("2026-01-01", "2026-01-31", 10, vec![5, 7]),
        ("1999-01-01", "1999-01-02", 10, vec![]),
    ];

    let uri = server.uri();
    let data_dir = dir.path().to_path_buf();
    let results = blocking(move || {
        let real = logged_in(&uri);
        let mut mock = MockCompassClient::with_data_dir(&uri, data_dir);
        mock.login().unwrap();

        queries
            .into_iter()
            .map(|(start, end, limit, expected)| {
                let real_ids = ids(&real.calendar_events(start, end, limit).unwrap());
                let mock_ids = ids(&mock.calendar_events(start, end, limit).unwrap());
                (start, end, limit, expected, real_ids, mock_ids)
            })
            .collect::<Vec<_>>()
    })
    .await;

    for (start, end, limit, expected, real, mock) in results {
        let expected: Vec<Value> = expected.into_iter().map(Value::from).collect();
        assert_eq!(real, expected, "real client, {start}..{end} limit {limit}");
        assert_eq!(mock, real, "mock client, {start}..{end} limit {limit}");
    }
}
