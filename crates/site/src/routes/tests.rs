#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use crate::config::{AdminRoutes, SiteConfig};
use crate::middleware::create_session_layer;
use crate::router;
use crate::state::AppState;
use crate::supabase::test_support::{ANON_KEY, config_for};

const ACCESS_TOKEN: &str = "header.payload.signed-in";
const CLIENT_IP: &str = "203.0.113.7";

fn test_config(server: &MockServer) -> SiteConfig {
    SiteConfig {
        database_url: SecretString::from("postgres://localhost/studio_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        supabase: config_for(server),
        admin: AdminRoutes {
            path: "/hq".to_string(),
            login_path: "/hq/login".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The full router with an in-memory session store; the pool never connects.
fn app(server: &MockServer) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/studio_test")
        .unwrap();
    let state = AppState::new(test_config(server), pool).unwrap();
    let session_layer = create_session_layer(MemoryStore::default(), state.config());
    router(state).layer(session_layer)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn mock_public_content(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/services")
                .query_param("is_public", "eq.true");
            then.status(200).json_body(json!([{
                "id": "00000000-0000-0000-0000-000000000001",
                "title": "Product Design",
                "description": "Research, flows and interface design.",
                "cta_label": "Book a call",
                "cta_url": "#contact",
                "position": 0,
                "is_public": true
            }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/projects_portfolio");
            then.status(200).json_body(json!([{
                "id": "harbor-app",
                "name": "Harbor",
                "hook": "Booking for marinas.",
                "technologies": ["Rust", "Svelte"],
                "type": "production",
                "color": "gradient",
                "is_flagship": true,
                "created_at": "2025-03-01T00:00:00Z"
            }]));
        })
        .await;
}

async fn sign_in(server: &MockServer, app: &Router) -> String {
    sign_in_for(server, app, 3600).await
}

/// Sign in with an access token valid for `lifetime` seconds.
async fn sign_in_for(server: &MockServer, app: &Router, lifetime: i64) -> String {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .json_body(json!({ "email": "owner@studio.test", "password": "correct horse" }));
            then.status(200).json_body(json!({
                "access_token": ACCESS_TOKEN,
                "refresh_token": "refresh-1",
                "expires_in": lifetime,
                "expires_at": chrono::Utc::now().timestamp() + lifetime,
                "user": {
                    "id": "00000000-0000-0000-0000-0000000000aa",
                    "email": "owner@studio.test"
                }
            }));
        })
        .await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/hq/login",
            "email=owner%40studio.test&password=correct+horse&next=%2Fhq%2Fcontacts",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq/contacts");
    session_cookie(&response)
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start_async().await;
    let response = app(&server).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_home_renders_public_content() {
    let server = MockServer::start_async().await;
    mock_public_content(&server).await;

    let response = app(&server).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));

    let body = body_text(response).await;
    assert!(body.contains("Product Design"));
    assert!(body.contains("Book a call"));
    assert!(body.contains("Harbor"));
    assert!(body.contains("/portfolio/harbor-app"));
    assert!(body.contains("accent-gradient"));
}

#[tokio::test]
async fn test_home_survives_backend_outage() {
    let server = MockServer::start_async().await;
    for table in ["/rest/v1/services", "/rest/v1/projects_portfolio"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(table);
                then.status(503).json_body(json!({ "message": "upstream unavailable" }));
            })
            .await;
    }

    let response = app(&server).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Our services will be listed here soon."));
    assert!(body.contains("contact-form"));
}

#[tokio::test]
async fn test_contact_submission_redirects_to_thank_you() {
    let server = MockServer::start_async().await;
    let insert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/contacts")
                .header("authorization", format!("Bearer {ANON_KEY}"))
                .json_body(json!({
                    "name": "Jo Rivera",
                    "email": "jo@example.com",
                    "phone": null,
                    "subject": null,
                    "message": "We need a new site.",
                    "status": "new"
                }));
            then.status(201);
        })
        .await;

    let response = app(&server)
        .oneshot(form_post(
            "/contact",
            "name=Jo+Rivera&email=jo%40example.com&phone=&subject=&message=We+need+a+new+site.",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?sent=1#contact");
    insert.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_invalid_contact_rerenders_with_errors() {
    let server = MockServer::start_async().await;
    mock_public_content(&server).await;
    let insert = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/contacts");
            then.status(201);
        })
        .await;

    let response = app(&server)
        .oneshot(form_post(
            "/contact",
            "name=Jo&email=not-an-email&message=Hello",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("Please enter a valid email address."));
    // What the visitor typed is kept
    assert!(body.contains("not-an-email"));
    insert.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_contact_form_is_rate_limited() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/contacts");
            then.status(201);
        })
        .await;

    let app = app(&server);
    let mut statuses = Vec::new();
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(form_post(
                "/contact",
                "name=Jo&email=jo%40example.com&message=Hello",
            ))
            .await
            .unwrap();
        statuses.push(response.status());
    }
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/projects_portfolio")
                .query_param("id", "eq.ghost");
            then.status(200).json_body(json!([]));
        })
        .await;

    let app = app(&server);
    let response = app.clone().oneshot(get("/portfolio/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/portfolio/Not%20A%20Slug")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_session() {
    let server = MockServer::start_async().await;
    let app = app(&server);

    let response = app.clone().oneshot(get("/hq/services")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq/login?next=%2Fhq%2Fservices");

    let request = Request::builder()
        .uri("/hq")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_default_admin_path_is_not_mounted() {
    let server = MockServer::start_async().await;
    let response = app(&server).oneshot(get("/admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_page_renders() {
    let server = MockServer::start_async().await;
    let response = app(&server)
        .oneshot(get("/hq/login?next=%2Fhq%2Fmedia"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(r#"action="/hq/login""#));
    assert!(body.contains(r#"name="next""#));
    assert!(body.contains("media"));
}

#[tokio::test]
async fn test_wrong_password_shows_provider_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        })
        .await;

    let response = app(&server)
        .oneshot(form_post(
            "/hq/login",
            "email=owner%40studio.test&password=wrong&next=",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid login credentials"));
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(200).json_body(json!({
                "access_token": ACCESS_TOKEN,
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "user": { "id": "00000000-0000-0000-0000-0000000000aa" }
            }));
        })
        .await;

    let response = app(&server)
        .oneshot(form_post(
            "/hq/login",
            "email=owner%40studio.test&password=pw&next=https%3A%2F%2Fevil.example%2Fhq",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq");
}

#[tokio::test]
async fn test_signed_in_admin_reads_inbox_with_own_token() {
    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in(&server, &app).await;

    let inbox = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/contacts")
                .header("authorization", format!("Bearer {ACCESS_TOKEN}"))
                .query_param("order", "created_at.desc");
            then.status(200).json_body(json!([{
                "id": "00000000-0000-0000-0000-00000000000a",
                "name": "Sam Lee",
                "email": "sam@example.com",
                "subject": "Rebrand",
                "message": "Can you help?",
                "status": "new",
                "created_at": "2025-02-01T12:00:00Z"
            }]));
        })
        .await;

    let request = Request::builder()
        .uri("/hq/contacts")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    inbox.assert_async().await;

    let body = body_text(response).await;
    assert!(body.contains("Sam Lee"));
    assert!(body.contains("Rebrand"));
    assert!(body.contains("owner@studio.test"));
}

fn admin_get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_once() {
    const REFRESHED_TOKEN: &str = "header.payload.refreshed";

    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in_for(&server, &app, 10).await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token")
                .json_body(json!({ "refresh_token": "refresh-1" }));
            then.status(200).json_body(json!({
                "access_token": REFRESHED_TOKEN,
                "refresh_token": "refresh-2",
                "expires_in": 3600,
                "expires_at": chrono::Utc::now().timestamp() + 3600,
                "user": {
                    "id": "00000000-0000-0000-0000-0000000000aa",
                    "email": "owner@studio.test"
                }
            }));
        })
        .await;
    let inbox = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/contacts")
                .header("authorization", format!("Bearer {REFRESHED_TOKEN}"));
            then.status(200).json_body(json!([]));
        })
        .await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(admin_get("/hq/contacts", &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The second request reads the stored tokens instead of refreshing again
    refresh.assert_hits_async(1).await;
    inbox.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in_for(&server, &app, 10).await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Already Used"
            }));
        })
        .await;
    let inbox = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/contacts");
            then.status(200).json_body(json!([]));
        })
        .await;

    let response = app
        .clone()
        .oneshot(admin_get("/hq/contacts?status=new", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/hq/login?next=%2Fhq%2Fcontacts%3Fstatus%3Dnew"
    );

    // The session is gone, so the old cookie no longer triggers a refresh
    let response = app.oneshot(admin_get("/hq", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq/login?next=%2Fhq");
    refresh.assert_hits_async(1).await;
    inbox.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_service_validation_error_rerenders_form() {
    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in(&server, &app).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/services");
            then.status(201).json_body(json!([]));
        })
        .await;

    let mut request = form_post("/hq/services", "title=&description=&position=-1");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("field-error"));
    create.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_delete_service_flashes_and_redirects() {
    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in(&server, &app).await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/services")
                .query_param("id", "eq.00000000-0000-0000-0000-000000000001");
            then.status(200).json_body(json!([{
                "id": "00000000-0000-0000-0000-000000000001",
                "title": "Old",
                "position": 0
            }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/services");
            then.status(200).json_body(json!([]));
        })
        .await;

    let mut request = form_post(
        "/hq/services/00000000-0000-0000-0000-000000000001/delete",
        "",
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq/services");

    // The flash shows once on the next page
    let request = Request::builder()
        .uri("/hq/services")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(body_text(response).await.contains("Service deleted."));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let server = MockServer::start_async().await;
    let app = app(&server);
    let cookie = sign_in(&server, &app).await;
    let revoke = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", format!("Bearer {ACCESS_TOKEN}"));
            then.status(204);
        })
        .await;

    let mut request = form_post("/hq/logout", "");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hq/login");
    revoke.assert_async().await;

    let request = Request::builder()
        .uri("/hq")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
