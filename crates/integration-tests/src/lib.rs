//! Integration tests for the Panificación Modelo storefront.
//!
//! Each test starts the real router on an ephemeral port, pointed at a
//! `wiremock` server standing in for the Supabase project, and drives it
//! with a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p panaderia-integration-tests
//! ```
//!
//! Mocks that the catalog view needs must be mounted before [`TestApp::spawn`],
//! because mounting the view starts both fetches immediately.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::{Client, redirect};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use panaderia_storefront::app;
use panaderia_storefront::config::{CatalogConfig, StorefrontConfig, SupabaseConfig};
use panaderia_storefront::state::AppState;

/// Anon key the storefront sends to the mock.
pub const ANON_KEY: &str = "anon-key-for-tests";

/// Credentials accepted by [`mount_auth`].
pub const ADMIN_EMAIL: &str = "admin@panaderia.test";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// Minimum skeleton window used by the tests.
pub const MIN_LOADING: Duration = Duration::from_millis(300);

/// A running storefront and the client that talks to it.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub supabase: MockServer,
}

impl TestApp {
    /// Start the storefront against `supabase`.
    pub async fn spawn(supabase: MockServer) -> Self {
        let config = StorefrontConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            trust_proxy: false,
            supabase: SupabaseConfig {
                url: Url::parse(&supabase.uri()).expect("mock server URI"),
                anon_key: SecretString::from(ANON_KEY),
                image_bucket: "product-images".to_string(),
            },
            catalog: CatalogConfig {
                min_loading: MIN_LOADING,
                categories_stale_after: Duration::from_secs(3600),
                products_stale_after: Duration::from_secs(3600),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("application state");
        let router = app::router(state);

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            supabase,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path and return status and body.
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, String) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request");
        let status = response.status();
        (status, response.text().await.expect("response body"))
    }

    /// Sign in through the login form.
    pub async fn sign_in(&self) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
            .send()
            .await
            .expect("POST /login")
    }

    /// Poll `/productos` until it stops serving the skeleton.
    pub async fn wait_for_catalog(&self) -> (reqwest::StatusCode, String) {
        for _ in 0..50 {
            let (status, body) = self.get("/productos").await;
            if !body.contains("Cargando productos") {
                return (status, body);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("catalog never left the loading state");
    }
}

/// Categories in the order the backend returns them (by name).
#[must_use]
pub fn categories_body() -> Value {
    json!([
        {"id": 6, "name": "Bebidas"},
        {"id": 1, "name": "Cafetería"},
        {"id": 3, "name": "Panadería"},
        {"id": 9, "name": "Postres"}
    ])
}

/// Products, including one in an unlisted category.
#[must_use]
pub fn products_body() -> Value {
    json!([
        {"id": 1, "name": "Café con leche", "price": 2.5, "category_id": 1,
         "description": "Taza grande", "image_url": null, "user_id": "u1"},
        {"id": 2, "name": "Medialuna", "price": 0.9, "category_id": 3,
         "description": null, "image_url": null, "user_id": "u1"},
        {"id": 10, "name": "Pan de campo", "price": 3.0, "category_id": 3,
         "description": "", "image_url": null, "user_id": "u1"},
        {"id": 4, "name": "Tiramisú", "price": 4.0, "category_id": 9,
         "description": null, "image_url": null, "user_id": "u1"}
    ])
}

/// Mount both catalog reads with the given bodies.
pub async fn mount_catalog(server: &MockServer, categories: Value, products: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/Categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(categories))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/Products"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products))
        .mount(server)
        .await;
}

/// Mount the auth endpoints for [`ADMIN_EMAIL`].
pub async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(wiremock::matchers::body_json(json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {"id": "admin-1", "email": ADMIN_EMAIL}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "admin-1", "email": ADMIN_EMAIL})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}
