//! Supabase PostgREST client.
//!
//! Every request is authenticated with the privileged service key, which is
//! distinct from end-user tokens and must never leave the server.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Base URL of the Supabase project (no trailing slash).
    pub base_url: String,
    /// Privileged service role key.
    pub service_key: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl SupabaseConfig {
    /// Create config from environment variables.
    ///
    /// `SUPABASE_URL` and `SUPABASE_SERVICE_KEY` are required; missing either
    /// is a fatal startup error.
    pub fn from_env() -> StoreResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StoreError::config("SUPABASE_URL must be set"))?;
        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .map_err(|_| StoreError::config("SUPABASE_SERVICE_KEY must be set"))?;

        if base_url.is_empty() || service_key.is_empty() {
            return Err(StoreError::config(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY cannot be empty",
            ));
        }

        let timeout_secs: u64 = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let connect_timeout_secs: u64 = std::env::var("SUPABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }
}

/// Supabase REST API client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("cutout-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let rest_url = format!("{}/rest/v1", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            rest_url,
            service_key: config.service_key,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Select rows from a table with PostgREST query parameters
    /// (e.g. `("email", "eq.alice@example.com")`).
    pub async fn select(&self, table: &str, query: &[(&str, String)]) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table);
        debug!(table = %table, "Supabase select");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        Self::rows_from_response(response, &url).await
    }

    /// Partially update rows matching the given filters. Returns the updated
    /// rows (empty when no row matched the filters).
    pub async fn update(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table);
        debug!(table = %table, "Supabase update");

        let response = self
            .http
            .patch(&url)
            .query(query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            // Ask PostgREST to return the rows it touched so callers can tell
            // whether the conditional update matched anything.
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        Self::rows_from_response(response, &url).await
    }

    /// Lightweight reachability probe used by the readiness endpoint.
    pub async fn check_connectivity(&self) -> StoreResult<()> {
        let url = self.table_url("wondr_users");
        let response = self
            .http
            .get(&url)
            .query(&[("select", "email"), ("limit", "1")])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::from_http_status(
                status.as_u16(),
                format!("connectivity check failed: {} {}", status, body),
            ))
        }
    }

    async fn rows_from_response(response: reqwest::Response, url: &str) -> StoreResult<Vec<Value>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_http_status(
                status.as_u16(),
                format!("{} failed: {} {}", url, status, body),
            ));
        }

        // PostgREST answers 200/204; 204 carries no body.
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }
}
