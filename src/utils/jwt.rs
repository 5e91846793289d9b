//! Admin tokens.
//!
//! Tokens are issued by the university identity provider; this service only
//! verifies them. [`create_token`] exists for the CLI and for tests.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scolarite_config::JwtConfig;
use scolarite_core::AppError;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Account id at the identity provider
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

pub fn create_token(
    sub: &str,
    email: &str,
    role: &str,
    ttl_secs: i64,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();

    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: (now + ttl_secs).max(0) as usize,
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let config = JwtConfig::with_secret("test-secret");
        let token = create_token("42", "admin@universite.ma", ADMIN_ROLE, 3600, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, "42");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(
            "42",
            "admin@universite.ma",
            ADMIN_ROLE,
            3600,
            &JwtConfig::with_secret("one"),
        )
        .unwrap();

        let err = verify_token(&token, &JwtConfig::with_secret("two")).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = JwtConfig::with_secret("test-secret");
        let token = create_token("42", "admin@universite.ma", ADMIN_ROLE, -3600, &config).unwrap();
        assert!(verify_token(&token, &config).is_err());
    }
}
