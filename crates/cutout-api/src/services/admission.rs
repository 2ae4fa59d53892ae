//! Credit-gated admission flow for background removal.
//!
//! Per request: decode the payload, debit one credit, invoke the engine,
//! re-encode the result. A successful response corresponds to exactly one
//! debit; if the engine fails after the debit, a refund is attempted once
//! and its outcome is logged but never surfaced to the caller. No step is
//! retried at this level.

use tracing::{debug, warn};

use cutout_models::data_uri;
use cutout_store::StoreError;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Run one payload through the gate and return the PNG data-URI result.
pub async fn remove_background(
    state: &AppState,
    user: &AuthUser,
    data_sent: &str,
) -> ApiResult<String> {
    // Reject malformed payloads before any credit is touched.
    let image = data_uri::decode_image(data_sent)
        .map_err(|e| ApiError::bad_request(format!("Invalid image payload: {}", e)))?;

    let remaining = match state.ledger.debit(&user.email).await {
        Ok(remaining) => remaining,
        Err(e @ (StoreError::InsufficientCredit | StoreError::UserNotFound(_))) => {
            metrics::record_credit_denial();
            return Err(ApiError::from(e));
        }
        Err(e) => return Err(ApiError::from(e)),
    };
    debug!(user = %user.email, remaining = remaining, "Admitted request");

    match state.engine.remove_background(&image).await {
        Ok(bytes) => {
            metrics::record_removal();
            Ok(data_uri::encode_png(&bytes))
        }
        Err(e) => {
            warn!(user = %user.email, error = %e, "Removal failed after debit, refunding");
            match state.ledger.refund(&user.email).await {
                Ok(_) => metrics::record_refund(true),
                Err(refund_err) => {
                    // Best-effort: the request already failed for another
                    // reason, so the refund failure is only logged.
                    metrics::record_refund(false);
                    warn!(user = %user.email, error = %refund_err, "Credit refund failed");
                }
            }
            Err(ApiError::from(e))
        }
    }
}
