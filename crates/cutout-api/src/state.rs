//! Application state.

use std::sync::Arc;

use anyhow::Context;
use cutout_engine::EngineClient;
use cutout_store::{CreditLedger, SupabaseClient};

use crate::auth::TokenVerifier;
use crate::config::ApiConfig;

/// Shared application state.
///
/// Built once at startup and passed explicitly to every handler; there is no
/// ambient mutable state between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub ledger: Arc<CreditLedger>,
    pub engine: Arc<EngineClient>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Create application state from already-built components.
    pub fn new(
        config: ApiConfig,
        ledger: CreditLedger,
        engine: EngineClient,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            config,
            ledger: Arc::new(ledger),
            engine: Arc::new(engine),
            verifier: Arc::new(verifier),
        }
    }

    /// Create application state from environment variables.
    ///
    /// Any missing required value is a fatal startup error.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let store = SupabaseClient::from_env().context("Failed to create Supabase client")?;
        let ledger = CreditLedger::new(store);

        let engine = EngineClient::from_env().context("Failed to create engine client")?;

        let secret = std::env::var("SUPABASE_JWT_SECRET")
            .context("SUPABASE_JWT_SECRET must be set")?;
        if secret.is_empty() {
            anyhow::bail!("SUPABASE_JWT_SECRET cannot be empty");
        }

        Ok(Self::new(config, ledger, engine, TokenVerifier::new(&secret)))
    }
}
