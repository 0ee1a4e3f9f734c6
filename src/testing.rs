//! Test helpers: a freshly dropped database and an in-process HTTP client with cookies.

use crate::config::{DbConfig, DEFAULT_DB_HOST};
use crate::db::connect;
use crate::error::ConfigError;
use crate::orm::forget_database;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use mongodb::Database;
use std::collections::BTreeMap;
use tower::ServiceExt;

pub const DEFAULT_TEST_DB_NAME: &str = "UnitTestDB";

/// Database named by `TEST_DB_NAME` on `TEST_DB_HOST`, dropped before it is returned.
pub async fn fresh_database() -> Result<Database, ConfigError> {
    let host = std::env::var("TEST_DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.into());
    let name = std::env::var("TEST_DB_NAME").unwrap_or_else(|_| DEFAULT_TEST_DB_NAME.into());
    let config = DbConfig {
        hosts: host.split(',').map(|h| h.trim().to_string()).collect(),
        replica_set: std::env::var("TEST_DB_REPLSET").ok().filter(|s| !s.is_empty()),
        name,
        ..DbConfig::default()
    };
    let db = connect(&config).await?;
    db.drop(None).await.map_err(ConfigError::Connect)?;
    forget_database(db.name());
    Ok(db)
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends requests straight into an application; cookies set by responses are sent back
/// on later requests.
pub struct TestClient {
    app: axum::Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn new(app: axum::Router) -> Self {
        TestClient {
            app,
            cookies: BTreeMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// GET `path` with `params` as the query string.
    pub async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> TestResponse {
        let uri = if params.is_empty() {
            path.to_string()
        } else {
            let query = serde_urlencoded::to_string(params).unwrap_or_default();
            format!("{}?{}", path, query)
        };
        self.send(Method::GET, &uri, None).await
    }

    /// POST `form` as `application/x-www-form-urlencoded`.
    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(form).unwrap_or_default();
        self.send(Method::POST, path, Some(("application/x-www-form-urlencoded", body)))
            .await
    }

    /// POST a JSON body.
    pub async fn post_json(&mut self, path: &str, body: &serde_json::Value) -> TestResponse {
        self.send(Method::POST, path, Some(("application/json", body.to_string())))
            .await
    }

    async fn send(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<(&str, String)>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some((content_type, body)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("valid test request");
        let res = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router is infallible");
        let status = res.status();
        let headers = res.headers().clone();
        self.update_cookies(&headers);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("readable test body");
        TestResponse { status, headers, body }
    }

    fn update_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default();
            if let Some((name, val)) = pair.split_once('=') {
                self.cookies.insert(name.trim().to_string(), val.trim().to_string());
            }
        }
    }
}
