//! Supabase access token authentication.
//!
//! Tokens are verified locally against the project's shared HS256 signing
//! secret; no call to the auth authority is made per request. The resolved
//! identity is the `email` claim, matching the key the credit ledger uses.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Audience claim Supabase puts on end-user access tokens.
const EXPECTED_AUDIENCE: &str = "authenticated";

/// Decoded access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email (the ledger identity key)
    pub email: Option<String>,
    /// Audience
    pub aud: String,
    /// Expiration
    pub exp: i64,
}

/// Verifies access tokens against the shared signing secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for the given HS256 secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[EXPECTED_AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token's signature, expiry, and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;
        Ok(data.claims)
    }
}

/// Authenticated user extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.verifier.verify(token)?;

        let email = claims
            .email
            .ok_or_else(|| ApiError::unauthorized("Token missing email claim"))?;

        Ok(AuthUser {
            uid: claims.sub,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-jwt-secret";

    fn make_token(secret: &str, email: Option<&str>, aud: &str, exp: i64) -> String {
        let claims = Claims {
            sub: "user-1".to_string(),
            email: email.map(|s| s.to_string()),
            aud: aud.to_string(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = make_token(SECRET, Some("alice@example.com"), "authenticated", future_exp());
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = make_token("other-secret", Some("alice@example.com"), "authenticated", future_exp());
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let expired = chrono::Utc::now().timestamp() - 3600;
        let token = make_token(SECRET, Some("alice@example.com"), "authenticated", expired);
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = make_token(SECRET, Some("alice@example.com"), "other-app", future_exp());
        assert!(verifier.verify(&token).is_err());
    }
}
