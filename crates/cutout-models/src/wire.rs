//! Wire types for the removal endpoint.

use serde::{Deserialize, Serialize};

/// Request body for `POST /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBackgroundRequest {
    /// Base64 image payload, optionally prefixed with a data-URI scheme marker.
    pub data_sent: String,
}

/// Response body for `POST /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBackgroundResponse {
    /// Result image as a PNG data-URI.
    pub data_received: String,
}
