//! HS256 access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tubely_core::constants::JWT_ISSUER;
use tubely_core::{AppError, Config};
use uuid::Uuid;

use super::models::AccessClaims;

/// Issues and validates the bearer tokens that identify a caller.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl JwtService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jwt_secret(), config.jwt_expiry_hours())
    }

    /// Sign a token for `user_id`.
    pub fn make_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            iss: JWT_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Verify signature, issuer and expiry and return the subject.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[JWT_ISSUER]);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::Unauthorized("Invalid token issuer".to_string())
                    }
                    _ => AppError::Unauthorized("Couldn't validate JWT".to_string()),
                }
            })?;

        Ok(token_data.claims.sub)
    }
}
