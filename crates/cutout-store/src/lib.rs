//! Supabase REST API client.
//!
//! This crate provides:
//! - A thin PostgREST client authenticated with the privileged service key
//! - The credit ledger repository (conditional debit, best-effort refund)
//! - Retry configuration for optimistic-locking conflicts

pub mod client;
pub mod error;
pub mod ledger;
pub mod retry;

pub use client::{SupabaseClient, SupabaseConfig};
pub use error::{StoreError, StoreResult};
pub use ledger::CreditLedger;
pub use retry::RetryConfig;
