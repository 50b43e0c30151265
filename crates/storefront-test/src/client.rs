//! HTTP test client.
//!
//! [`TestClient`] drives an Axum router with `tower::ServiceExt::oneshot` and
//! collects the response into a [`TestResponse`].
//!
//! ```rust,no_run
//! use axum::routing::get;
//! use axum::Router;
//! use storefront_test::client::TestClient;
//!
//! async fn example() {
//!     let app = Router::new().route("/ping", get(|| async { "pong" }));
//!     let client = TestClient::new(app);
//!
//!     let response = client.get("/ping").await;
//!     assert_eq!(response.status_code(), 200);
//!     assert_eq!(response.text(), "pong");
//! }
//! ```

use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::Serialize;
use serde_json::Value;
use storefront_core::{StoreError, StoreResult};
use tower::ServiceExt;

/// Sends simulated requests to a router.
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Router,
}

impl TestClient {
    /// Wraps a router.
    pub const fn new(app: Router) -> Self {
        Self { app }
    }

    /// Sends a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> TestResponse {
        self.send(Method::POST, path, Some(encode(body))).await
    }

    /// Sends a PUT request with a JSON body.
    pub async fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> TestResponse {
        self.send(Method::PUT, path, Some(encode(body))).await
    }

    /// Sends a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(bytes) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes)),
            None => builder.body(Body::empty()),
        }
        .expect("request builder should not fail");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Vec::new(), |collected| collected.to_bytes().to_vec());

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn encode<T: Serialize + ?Sized>(body: &T) -> Vec<u8> {
    serde_json::to_vec(body).expect("test body should serialize")
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body.
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Returns the numeric status code.
    pub const fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Deserializes the body.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    /// Returns the body as a JSON value, `Null` when it is not JSON.
    pub fn value(&self) -> Value {
        self.json().unwrap_or(Value::Null)
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
