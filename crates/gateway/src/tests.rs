use super::*;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use contactdesk_common::{
    db::models::Contact,
    kv::{KvBackend, MemoryBackend, RedisBackend},
    session::TokenCodec,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::{json, Value};
use tower::ServiceExt;

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn app_with(db: DatabaseConnection, backend: Arc<dyn KvBackend>) -> Router {
    let config = AppConfig::default();
    let sessions = SessionManager::from_config(&config.session, &config.redis, backend).unwrap();

    create_router(AppState {
        db: DbPool::from_connection(db),
        sessions: Arc::new(sessions),
        authenticator: Arc::new(StaticCredentials::from_config(&config.auth)),
        cookie: SessionCookie::from_config(&config.session),
        config: Arc::new(config),
    })
}

fn app(db: DatabaseConnection) -> Router {
    app_with(db, Arc::new(MemoryBackend::new()))
}

fn contact(id: i32, title: &str) -> Contact {
    Contact {
        id,
        name: "Kim".into(),
        mail: "kim@example.com".into(),
        telno: "010-0000-0000".into(),
        referrer: String::new(),
        title: title.into(),
        contents: "Hello".into(),
        confirm: true,
        created_at: chrono::Utc::now().into(),
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

/// Log in and return the `name=value` cookie pair
async fn login(app: &Router) -> String {
    let (status, headers, _) = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "admin123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_root_banner() {
    let (status, _, body) = send(&app(empty_db()), Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Contactdesk API is running");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = app(empty_db());
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "admin123"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Login successful"}));

    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("session_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=3600"));
    assert!(set_cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let app = app(empty_db());
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::SET_COOKIE).is_none());
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = app(empty_db());
    let cookie = login(&app).await;

    let (status, _, info) = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["user_data"]["username"], "admin");
    assert_eq!(info["user_data"]["role"], "admin");
    assert!(info["session_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(info["created_at"].is_string());
    assert!(info["last_accessed"].is_string());

    let (status, _, body) =
        send(&app, Method::POST, "/api/session/extend", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Session extended"}));

    let (status, headers, body) =
        send(&app, Method::POST, "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let cleared = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.starts_with("session_token=;"));
    assert!(cleared.contains("Max-Age=0"));

    // The old cookie still carries a valid signature but no longer works
    let (status, _, _) = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app, Method::POST, "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_reject_uniformly() {
    let app = app(empty_db());
    let cookie = login(&app).await;
    let tampered = format!("{}A", cookie);
    let unknown = format!(
        "session_token={}",
        TokenCodec::new("change-me").unwrap().encode("no-such-session")
    );

    let routes = [
        (Method::GET, "/api/session"),
        (Method::POST, "/api/session/extend"),
        (Method::POST, "/api/logout"),
        (Method::GET, "/api/contactus"),
        (Method::GET, "/api/contactus/1"),
    ];

    let expected = json!({
        "error": {"code": "UNAUTHORIZED", "message": "Authentication required"}
    });

    for (method, uri) in routes {
        for credential in [None, Some(tampered.as_str()), Some(unknown.as_str())] {
            let (status, _, body) = send(&app, method.clone(), uri, credential, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(body, expected);
        }
    }
}

#[tokio::test]
async fn test_anonymous_contact_creation() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![contact(5, "Question")]])
        .into_connection();
    let app = app(db);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/contactus",
        None,
        Some(json!({
            "name": "Kim",
            "mail": "kim@example.com",
            "title": "Question",
            "contents": "Hello",
            "confirm": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "id": 5}));
}

#[tokio::test]
async fn test_invalid_contact_rejected() {
    let app = app(empty_db());
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/contactus",
        None,
        Some(json!({
            "name": "Kim",
            "mail": "not-an-email",
            "title": "Question",
            "contents": "Hello",
            "confirm": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "mail");
}

#[tokio::test]
async fn test_contact_reads_with_session() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![contact(2, "Newer"), contact(1, "Older")]])
        .append_query_results([vec![contact(1, "Older")]])
        .append_query_results([Vec::<Contact>::new()])
        .into_connection();
    let app = app(db);
    let cookie = login(&app).await;

    let (status, _, list) = send(&app, Method::GET, "/api/contactus", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["title"], "Newer");
    assert_eq!(list[0]["telno"], "010-0000-0000");

    let (status, _, found) =
        send(&app, Method::GET, "/api/contactus/1", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], 1);

    let (status, _, missing) =
        send(&app, Method::GET, "/api/contactus/99", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"]["code"], "CONTACT_NOT_FOUND");
}

#[tokio::test]
async fn test_store_outage_is_not_an_auth_failure() {
    // Nothing listens on port 1
    let backend = Arc::new(RedisBackend::new("redis://127.0.0.1:1/0").unwrap());
    let app = app_with(empty_db(), backend);
    let token = TokenCodec::new("change-me").unwrap().encode("some-session");

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/api/session",
        Some(&format!("session_token={}", token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "admin123"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Anonymous requests without a cookie never reach the store
    let (status, _, _) = send(&app, Method::GET, "/api/contactus", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app(empty_db());
    let (status, _, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_gives_up_on_hung_requests() {
    let signalled = Notify::new();
    signalled.notify_one();

    let hung = std::future::pending::<std::io::Result<()>>();
    let started = tokio::time::Instant::now();
    let result = serve_with_drain_limit(hung, &signalled, Duration::from_secs(30)).await;

    assert!(result.is_ok());
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_drained_server() {
    let signalled = Notify::new();
    signalled.notify_one();

    let draining = async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(std::io::Error::other("listener failed"))
    };
    let result = serve_with_drain_limit(draining, &signalled, Duration::from_secs(30)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_server_exit_before_signal_is_returned() {
    let signalled = Notify::new();
    let result = serve_with_drain_limit(async { Ok(()) }, &signalled, Duration::from_secs(1)).await;
    assert!(result.is_ok());
}
