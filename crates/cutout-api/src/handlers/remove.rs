//! Background removal handler.

use axum::extract::State;
use axum::Json;

use cutout_models::{RemoveBackgroundRequest, RemoveBackgroundResponse};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::admission;
use crate::state::AppState;

/// `POST /` — authenticate, spend one credit, remove the background.
pub async fn remove_background(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RemoveBackgroundRequest>,
) -> ApiResult<Json<RemoveBackgroundResponse>> {
    let data_received = admission::remove_background(&state, &user, &request.data_sent).await?;
    Ok(Json(RemoveBackgroundResponse { data_received }))
}
