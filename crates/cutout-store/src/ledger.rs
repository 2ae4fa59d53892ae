//! Credit ledger repository.
//!
//! Balances live in the `wondr_users` table, keyed by email, in the integer
//! `rembg_credits` column. The debit is a conditional update filtered on the
//! balance the caller just observed, so two concurrent requests can never
//! spend the same credit; the loser of the race retries with backoff.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::SupabaseClient;
use crate::error::{StoreError, StoreResult};
use crate::retry::RetryConfig;

const USERS_TABLE: &str = "wondr_users";

/// Repository for per-user credit balances.
#[derive(Clone)]
pub struct CreditLedger {
    client: SupabaseClient,
    retry: RetryConfig,
}

impl CreditLedger {
    /// Create a new ledger with the default retry policy.
    pub fn new(client: SupabaseClient) -> Self {
        Self::with_retry(client, RetryConfig::from_env())
    }

    /// Create a new ledger with an explicit retry policy.
    pub fn with_retry(client: SupabaseClient, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Access the underlying client (used by readiness checks).
    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    /// Get the current credit balance for a user.
    ///
    /// An empty result set means the user has no account row and is treated
    /// as a denial by callers. Negative stored values clamp to zero.
    pub async fn balance(&self, email: &str) -> StoreResult<u32> {
        let rows = self
            .client
            .select(
                USERS_TABLE,
                &[
                    ("select", "rembg_credits,email".to_string()),
                    ("email", format!("eq.{}", email)),
                ],
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| StoreError::UserNotFound(email.to_string()))?;

        let credits = row
            .get("rembg_credits")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| StoreError::invalid_response("missing rembg_credits field"))?;

        Ok(credits.max(0) as u32)
    }

    /// Debit one credit from the user's balance.
    ///
    /// Fails with `InsufficientCredit` when the balance is zero. Returns the
    /// new balance on success.
    pub async fn debit(&self, email: &str) -> StoreResult<u32> {
        let mut last_error = None;

        for attempt in 0..self.retry.max_retries {
            let balance = self.balance(email).await?;
            if balance == 0 {
                return Err(StoreError::InsufficientCredit);
            }

            let new_balance = balance - 1;
            match self.compare_and_set(email, balance, new_balance).await {
                Ok(()) => {
                    info!(user = %email, balance = new_balance, "Debited one credit");
                    return Ok(new_balance);
                }
                Err(e) if e.is_precondition_failed() => {
                    // Another writer changed the balance; re-read and retry
                    debug!(
                        user = %email,
                        attempt = attempt + 1,
                        "Debit lost a write race, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                }
                Err(e) => {
                    warn!(user = %email, error = %e, "Failed to debit credit");
                    return Err(e);
                }
            }
        }

        warn!(
            user = %email,
            retries = self.retry.max_retries,
            error = ?last_error,
            "Debit failed after retries"
        );
        Err(StoreError::request_failed(
            "Failed to debit credit due to concurrent updates",
        ))
    }

    /// Return one credit to the user's balance.
    ///
    /// Compensating action after a post-debit failure. Callers treat errors
    /// as best-effort and only log them.
    pub async fn refund(&self, email: &str) -> StoreResult<u32> {
        let mut last_error = None;

        for attempt in 0..self.retry.max_retries {
            let balance = self.balance(email).await?;
            let new_balance = balance.saturating_add(1);

            match self.compare_and_set(email, balance, new_balance).await {
                Ok(()) => {
                    info!(user = %email, balance = new_balance, "Refunded one credit");
                    return Ok(new_balance);
                }
                Err(e) if e.is_precondition_failed() => {
                    debug!(
                        user = %email,
                        attempt = attempt + 1,
                        "Refund lost a write race, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            user = %email,
            retries = self.retry.max_retries,
            error = ?last_error,
            "Refund failed after retries"
        );
        Err(StoreError::request_failed(
            "Failed to refund credit due to concurrent updates",
        ))
    }

    /// Write `new_balance` only if the stored balance still equals `observed`.
    async fn compare_and_set(&self, email: &str, observed: u32, new_balance: u32) -> StoreResult<()> {
        let rows = self
            .client
            .update(
                USERS_TABLE,
                &[
                    ("email", format!("eq.{}", email)),
                    ("rembg_credits", format!("eq.{}", observed)),
                ],
                &json!({ "rembg_credits": new_balance }),
            )
            .await?;

        if rows.is_empty() {
            Err(StoreError::PreconditionFailed(format!(
                "balance for {} no longer {}",
                email, observed
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SupabaseConfig;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USERS_PATH: &str = "/rest/v1/wondr_users";

    fn test_ledger(server: &MockServer) -> CreditLedger {
        let client = SupabaseClient::new(SupabaseConfig {
            base_url: server.uri(),
            service_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();

        let retry = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        CreditLedger::with_retry(client, retry)
    }

    #[tokio::test]
    async fn test_balance_returns_credits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .and(query_param("email", "eq.alice@example.com"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 3, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert_eq!(ledger.balance("alice@example.com").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_balance_unknown_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert!(matches!(
            ledger.balance("nobody@example.com").await,
            Err(StoreError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_balance_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert!(matches!(
            ledger.balance("alice@example.com").await,
            Err(StoreError::RequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_debit_decrements_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 3, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(USERS_PATH))
            .and(query_param("rembg_credits", "eq.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 2, "email": "alice@example.com" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert_eq!(ledger.debit("alice@example.com").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_debit_insufficient_credit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 0, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;
        // No write may happen when the balance is already zero
        Mock::given(method("PATCH"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert!(matches!(
            ledger.debit("alice@example.com").await,
            Err(StoreError::InsufficientCredit)
        ));
    }

    #[tokio::test]
    async fn test_debit_retries_after_lost_race() {
        let server = MockServer::start().await;

        // First read observes 3, but the conditional write misses because a
        // concurrent debit already moved the balance to 2.
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 3, "email": "alice@example.com" }
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 2, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path(USERS_PATH))
            .and(query_param("rembg_credits", "eq.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(USERS_PATH))
            .and(query_param("rembg_credits", "eq.2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 1, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert_eq!(ledger.debit("alice@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refund_increments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 2, "email": "alice@example.com" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(USERS_PATH))
            .and(query_param("rembg_credits", "eq.2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "rembg_credits": 3, "email": "alice@example.com" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = test_ledger(&server);
        assert_eq!(ledger.refund("alice@example.com").await.unwrap(), 3);
    }
}
