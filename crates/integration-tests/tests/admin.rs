//! Login, admin panel and product writes.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::time::Duration;

use serde_json::Value;

use panaderia_integration_tests::{
    ADMIN_EMAIL, TestApp, categories_body, mount_auth, mount_catalog, products_body,
};

async fn app() -> TestApp {
    let supabase = MockServer::start().await;
    mount_catalog(&supabase, categories_body(), products_body()).await;
    mount_auth(&supabase).await;
    TestApp::spawn(supabase).await
}

fn location(response: &reqwest::Response) -> &str {
    response.headers()["location"].to_str().unwrap()
}

#[tokio::test]
async fn test_admin_requires_sign_in() {
    let app = app().await;

    for path in ["/admin", "/admin/productos/nuevo", "/admin/productos/2/editar"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/login", "{path}");
    }
}

#[tokio::test]
async fn test_sign_in_then_panel() {
    let app = app().await;

    let response = app.sign_in().await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/productos");

    let (_, body) = app.get("/").await;
    assert!(body.contains("¡Bienvenido!"));
    assert!(body.contains("Cerrar Sesión"));

    // Flash is shown once
    let (_, body) = app.get("/").await;
    assert!(!body.contains("¡Bienvenido!"));

    let (status, body) = app.get("/admin").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Medialuna"));
    assert!(body.contains("2 producto(s)"));
    assert!(body.contains("Sin descripción"));
    assert!(body.contains("$0.90"));

    let response = app.client.get(app.url("/admin")).send().await.unwrap();
    assert_eq!(response.headers()["cache-control"], "no-store, max-age=0");
}

#[tokio::test]
async fn test_sign_in_rejections() {
    let app = app().await;

    let response = app
        .client
        .post(app.url("/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Por favor completa todos los campos"));

    let response = app
        .client
        .post(app.url("/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.text().await.unwrap();
    assert!(body.contains("Error de autenticación"));
    assert!(body.contains(ADMIN_EMAIL));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = app().await;
    app.sign_in().await;

    let response = app.client.post(app.url("/logout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let (_, body) = app.get("/").await;
    assert!(body.contains("Sesión cerrada"));
    assert!(!body.contains("Cerrar Sesión"));

    let response = app.client.get(app.url("/admin")).send().await.unwrap();
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_create_product() {
    let app = app().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/Products"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(json!([{
            "name": "Tortita negra",
            "description": null,
            "price": 1.2,
            "image_url": null,
            "category_id": "3",
            "user_id": "admin-1"
        }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let form = Form::new()
        .text("category_id", "3")
        .text("name", "  Tortita negra ")
        .text("description", "")
        .text("price", "1.2")
        .text("image_url", "");
    let response = app
        .client
        .post(app.url("/admin/productos"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    let (_, body) = app.get("/admin").await;
    assert!(body.contains("Producto agregado"));
}

#[tokio::test]
async fn test_create_with_image_uploads_first() {
    let app = app().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/product-images/\d+_admin-1\.png$"))
        .and(header("x-upsert", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "ok"})))
        .expect(1)
        .mount(&app.supabase)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/Products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let image = Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("foto.PNG")
        .mime_str("image/png")
        .unwrap();
    let form = Form::new()
        .text("category_id", "3")
        .text("name", "Pan dulce")
        .text("price", "5")
        .part("image", image);
    let response = app
        .client
        .post(app.url("/admin/productos"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let requests = app.supabase.received_requests().await.unwrap();
    let insert = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/Products")
        .unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
    let image_url = rows[0]["image_url"].as_str().unwrap();
    assert!(image_url.contains("/storage/v1/object/public/product-images/"));
    assert!(image_url.ends_with("_admin-1.png"));
}

#[tokio::test]
async fn test_invalid_form_makes_no_write() {
    let app = app().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/Products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let form = Form::new()
        .text("category_id", "3")
        .text("name", "Pan")
        .text("price", "abc");
    let response = app
        .client
        .post(app.url("/admin/productos"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Precio inválido"));
    // Entered values survive the re-render
    assert!(body.contains(r#"value="abc""#));
}

#[tokio::test]
async fn test_update_failure_keeps_form() {
    let app = app().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/Products"))
        .and(query_param("id", "eq.2"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "new row violates row-level security policy"})),
        )
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let form = Form::new()
        .text("category_id", "3")
        .text("name", "Medialuna")
        .text("price", "1");
    let response = app
        .client
        .post(app.url("/admin/productos/2"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("row-level security"));
    assert!(body.contains("Editar Producto"));
}

#[tokio::test]
async fn test_edit_and_delete_product() {
    let app = app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "Medialuna", "price": 0.9, "category_id": 3,
             "description": "De manteca", "image_url": null, "user_id": "u1"}
        ])))
        .mount(&app.supabase)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/Products"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
        .expect(1)
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let (status, body) = app.get("/admin/productos/2/editar").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"value="Medialuna""#));
    assert!(body.contains("De manteca"));
    assert!(body.contains(r#"<option value="3" selected>Panadería</option>"#));

    let (status, body) = app.get("/admin/productos/2/eliminar").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Esta acción no se puede deshacer"));

    let response = app
        .client
        .post(app.url("/admin/productos/2/eliminar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    let (_, body) = app.get("/admin").await;
    assert!(body.contains("Producto eliminado"));
}

#[tokio::test]
async fn test_edit_missing_product_redirects_with_flash() {
    let app = app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .and(query_param("id", "eq.404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.supabase)
        .await;
    app.sign_in().await;

    let response = app
        .client
        .get(app.url("/admin/productos/404/editar"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin");

    let (_, body) = app.get("/admin").await;
    assert!(body.contains("No se encontró el producto a editar."));
}

/// Poll the public catalog until `name` is shown (or gone).
async fn catalog_shows(app: &TestApp, name: &str, shown: bool) -> bool {
    for _ in 0..40 {
        let (status, body) = app.get("/productos").await;
        if status == StatusCode::OK && body.contains(name) == shown {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn mount_products_once(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_writes_refresh_public_catalog() {
    let supabase = MockServer::start().await;
    let tortita = json!({"id": 11, "name": "Tortita negra", "price": 1.2, "category_id": 3,
                         "description": null, "image_url": null, "user_id": "admin-1"});
    let mut after_create = products_body();
    after_create.as_array_mut().unwrap().push(tortita);
    let mut after_delete = after_create.clone();
    after_delete
        .as_array_mut()
        .unwrap()
        .retain(|p| p["name"] != "Medialuna");

    // Each refetch of the list sees the next state of the table
    mount_products_once(&supabase, products_body()).await;
    mount_products_once(&supabase, after_create).await;
    mount_catalog(&supabase, categories_body(), after_delete).await;
    mount_auth(&supabase).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/Products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/Products"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
        .expect(1)
        .mount(&supabase)
        .await;

    let app = TestApp::spawn(supabase).await;
    let (status, body) = app.wait_for_catalog().await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Medialuna"));
    assert!(!body.contains("Tortita negra"));
    app.sign_in().await;

    let form = Form::new()
        .text("category_id", "3")
        .text("name", "Tortita negra")
        .text("description", "")
        .text("price", "1.2")
        .text("image_url", "");
    let response = app
        .client
        .post(app.url("/admin/productos"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(catalog_shows(&app, "Tortita negra", true).await);
    assert!(catalog_shows(&app, "Medialuna", true).await);

    let response = app
        .client
        .post(app.url("/admin/productos/2/eliminar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(catalog_shows(&app, "Medialuna", false).await);
    assert!(catalog_shows(&app, "Tortita negra", true).await);
}
