//! Public pages against a running server.

#![allow(clippy::unwrap_used)]

use reqwest::{StatusCode, header};
use studio_integration_tests::{TestContext, location};

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_health_endpoints() {
    let ctx = TestContext::new();

    let response = ctx.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = ctx.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_home_page() {
    let ctx = TestContext::new();
    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");

    let body = response.text().await.unwrap();
    assert!(body.contains(r#"id="services""#));
    assert!(body.contains(r#"id="contact""#));
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_static_assets_are_served() {
    let ctx = TestContext::new();
    let response = ctx.get("/static/css/main.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_unknown_project_is_not_found() {
    let ctx = TestContext::new();
    let slug = format!("missing-{}", uuid::Uuid::new_v4().simple());
    let response = ctx.get(&format!("/portfolio/{slug}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_invalid_contact_is_rejected() {
    let ctx = TestContext::new();
    let response = ctx
        .post_form(
            &ctx.url("/contact"),
            &[("name", ""), ("email", "nope"), ("message", "")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(location(&response).is_empty());
}
