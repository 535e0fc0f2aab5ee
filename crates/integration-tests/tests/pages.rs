//! Public pages, 404 and response headers.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use wiremock::MockServer;

use panaderia_integration_tests::{TestApp, categories_body, mount_catalog, products_body};

async fn app() -> TestApp {
    let supabase = MockServer::start().await;
    mount_catalog(&supabase, categories_body(), products_body()).await;
    TestApp::spawn(supabase).await
}

#[tokio::test]
async fn test_home_page() {
    let app = app().await;

    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Bienvenidos a"));
    assert!(body.contains(r#"href="/productos""#));
    assert!(body.contains(r#"href="/informacion""#));
    // Admin controls only appear when signed in
    assert!(!body.contains("Cerrar Sesión"));
}

#[tokio::test]
async fn test_info_page() {
    let (status, body) = app().await.get("/informacion").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Información"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (status, body) = app().await.get("/no-existe").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("La página no existe"));
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = app().await;

    let response = app
        .client
        .get(app.url("/"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-42");
    assert_eq!(headers["x-frame-options"], "DENY");
    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.contains(&format!("img-src 'self' data: {}", app.supabase.uri())));
    assert!(headers.get("cache-control").is_none());
}

#[tokio::test]
async fn test_liveness() {
    let (status, body) = app().await.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
