use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// PostgREST error codes that mean "the relation does not exist".
/// The server answered, so the network path and key handshake are fine.
const MISSING_RELATION_CODES: &[&str] = &["PGRST116", "PGRST205", "42P01"];

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("{service} error {code}: {message}")]
    Service {
        service: &'static str,
        code: String,
        message: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    /// True when the error is a transport-level failure (refused, DNS,
    /// timeout) rather than a response from the service.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }

    /// The "resource not found" signature from the data store: proof the
    /// server is reachable even though the probed table is absent.
    pub fn is_missing_relation(&self) -> bool {
        match self {
            ClientError::Service {
                service: "postgrest",
                code,
                ..
            } => MISSING_RELATION_CODES.contains(&code.as_str()),
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthHealth {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// Handle on the backend's HTTP surface: PostgREST, storage and auth all
/// hang off the same base URL and accept the same anon key.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl BackendClient {
    pub fn new(config: &Config, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Minimal read against a table, used to probe the data path. A
    /// missing-relation error from PostgREST is the caller's business to
    /// reclassify; everything else surfaces as-is.
    pub fn probe_table(&self, table: &str) -> Result<Vec<Value>, ClientError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(target: "client", "GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("select", "*"), ("limit", "1")])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .map_err(ClientError::Connection)?;

        if !response.status().is_success() {
            return Err(service_error("postgrest", response));
        }

        response.json().map_err(ClientError::Decode)
    }

    pub fn list_buckets(&self) -> Result<Vec<Bucket>, ClientError> {
        let url = format!("{}/storage/v1/bucket", self.base_url);
        debug!(target: "client", "GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .map_err(ClientError::Connection)?;

        if !response.status().is_success() {
            return Err(service_error("storage", response));
        }

        response.json().map_err(ClientError::Decode)
    }

    /// The auth service has no anonymous session endpoint, so reachability
    /// is probed through its health resource instead.
    pub fn auth_health(&self) -> Result<AuthHealth, ClientError> {
        let url = format!("{}/auth/v1/health", self.base_url);
        debug!(target: "client", "GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .send()
            .map_err(ClientError::Connection)?;

        if !response.status().is_success() {
            return Err(service_error("auth", response));
        }

        response.json().map_err(ClientError::Decode)
    }
}

/// Normalize an error response into a Service error. The three services
/// use different body shapes (PostgREST: {code, message}; storage:
/// {statusCode, error, message}; auth: {code, msg}), so this digs for the
/// first field that fits rather than deserializing a fixed struct.
fn service_error(service: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let parsed: Option<Value> = serde_json::from_str(&body).ok();

    let code = parsed
        .as_ref()
        .and_then(|v| extract_string(v, &["code", "error", "statusCode"]))
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = parsed
        .as_ref()
        .and_then(|v| extract_string(v, &["message", "msg", "error_description"]))
        .unwrap_or_else(|| fallback_message(status, &body));

    ClientError::Service {
        service,
        code,
        message,
    }
}

fn extract_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        // Keep diagnostics on one line even for HTML error pages
        trimmed.chars().take(120).collect::<String>()
    }
}
