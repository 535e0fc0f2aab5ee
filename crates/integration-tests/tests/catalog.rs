//! Public catalog: skeleton window, grouped output, failure and retry.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use panaderia_integration_tests::{
    MIN_LOADING, TestApp, categories_body, mount_catalog, products_body,
};

#[tokio::test]
async fn test_skeleton_then_grouped_catalog() {
    let supabase = MockServer::start().await;
    mount_catalog(&supabase, categories_body(), products_body()).await;
    let app = TestApp::spawn(supabase).await;

    // Both fetches answer at once, but the skeleton holds for the window
    let (status, body) = app.get("/productos").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Cargando productos"));
    assert!(body.contains(r#"<meta http-equiv="refresh" content="1">"#));

    tokio::time::sleep(MIN_LOADING + Duration::from_millis(100)).await;
    let (status, body) = app.wait_for_catalog().await;

    assert_eq!(status, StatusCode::OK);
    let cafeteria = body.find(r#"id="cafeteria""#).unwrap();
    let panaderia = body.find(r#"id="panaderia""#).unwrap();
    let bebidas = body.find(r#"id="bebidas""#).unwrap();
    assert!(cafeteria < panaderia && panaderia < bebidas);

    // Ordinal id order inside a group: "10" before "2"
    let pan = body.find("Pan de campo").unwrap();
    let medialuna = body.find("Medialuna").unwrap();
    assert!(pan < medialuna);

    // Unlisted category and its products never appear
    assert!(!body.contains("Postres"));
    assert!(!body.contains("Tiramisú"));

    assert!(body.contains("No hay productos en esta categoría"));
    assert!(body.contains("$2.50"));
    assert!(body.contains("Sin imagen"));
}

#[tokio::test]
async fn test_incomplete_rows_render_without_failing() {
    let supabase = MockServer::start().await;
    mount_catalog(
        &supabase,
        json!([{"id": 3, "name": "Panadería"}, {"id": 5, "name": null}]),
        json!([
            {"id": 1, "name": "Pan sin precio", "price": null, "category_id": 3},
            {"id": 2, "name": null, "category_id": 3}
        ]),
    )
    .await;
    let app = TestApp::spawn(supabase).await;

    tokio::time::sleep(MIN_LOADING + Duration::from_millis(100)).await;
    let (status, body) = app.wait_for_catalog().await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Pan sin precio"));
    // No price row at all, not a placeholder
    assert!(!body.contains("product-card__price"));
}

#[tokio::test]
async fn test_failed_fetch_shows_error_and_retry_recovers() {
    let supabase = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "relation missing"})),
        )
        .up_to_n_times(1)
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body()))
        .mount(&supabase)
        .await;
    let app = TestApp::spawn(supabase).await;

    tokio::time::sleep(MIN_LOADING + Duration::from_millis(100)).await;
    let (status, body) = app.wait_for_catalog().await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Reintentar"));
    assert!(body.contains("Referencia"));

    let (ready, _) = app.get("/health/ready").await;
    assert_eq!(ready, StatusCode::SERVICE_UNAVAILABLE);

    // A failure is terminal until the visitor asks again
    let (status, _) = app.get("/productos").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .client
        .post(app.url("/productos/reintentar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/productos");

    tokio::time::sleep(MIN_LOADING + Duration::from_millis(100)).await;
    let (status, body) = app.wait_for_catalog().await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Medialuna"));

    let (ready, _) = app.get("/health/ready").await;
    assert_eq!(ready, StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_reads_use_anon_key() {
    let supabase = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Categories"))
        .and(wiremock::matchers::header(
            "apikey",
            panaderia_integration_tests::ANON_KEY,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body()))
        .expect(1)
        .mount(&supabase)
        .await;
    let app = TestApp::spawn(supabase).await;

    tokio::time::sleep(MIN_LOADING + Duration::from_millis(100)).await;
    let (status, _) = app.wait_for_catalog().await;
    assert_eq!(status, StatusCode::OK);

    // Fresh snapshots are served without refetching
    let (status, _) = app.get("/productos").await;
    assert_eq!(status, StatusCode::OK);
}
