/*!
 * # Authentication Module
 *
 * Bearer-token authentication for the checkout API. Verification is
 * stateless: a signed HS256 token whose `sub` claim carries the user id.
 * Login/registration flows live outside this service; `AuthService`
 * mints tokens for tests and operator tooling.
 */

use crate::config::AppConfig;
use crate::errors::ServiceError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Claim structure for access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Expiration time
    pub exp: i64,
    /// Issued at time
    pub iat: i64,
    /// Unique identifier for this token
    pub jti: String,
}

/// Token issuance and verification
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    jwt_expiration: usize,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiration: config.jwt_expiration,
        }
    }

    /// Generate an access token for a user
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now + ChronoDuration::seconds(self.jwt_expiration as i64);

        let claims = Claims {
            sub: user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Failed to create token: {}", e)))
    }

    /// Verify a token and extract the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_expiration", &self.jwt_expiration)
            .finish_non_exhaustive()
    }
}

/// Authenticated user identity, extracted before the handler body runs.
/// Cart, checkout and payment routes take this as an argument; a missing
/// or bad token is rejected with 401 at extraction time.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing authorization header".to_string())
            })?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("Expected a bearer token".to_string()))?
            .trim();

        let claims = auth_service.verify_token(token)?;

        Ok(Self {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        AuthService {
            jwt_secret: "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_"
                .to_string(),
            jwt_expiration: 3600,
        }
    }

    #[test]
    fn generated_token_verifies_back_to_the_same_user() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let token = service.generate_token(user_id).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let service = test_service();
        let other = AuthService {
            jwt_secret: "zyxwvutsrqponmlkjihgfedcba9876543210ZYXWVUTSRQPONMLKJIHGFEDCBA-_"
                .to_string(),
            jwt_expiration: 3600,
        };

        let token = other.generate_token(Uuid::new_v4()).unwrap();

        match service.verify_token(&token) {
            Err(ServiceError::Unauthorized(reason)) => assert_eq!(reason, "Invalid token"),
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = test_service();
        let now = Utc::now();

        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: (now - ChronoDuration::hours(2)).timestamp(),
            iat: (now - ChronoDuration::hours(3)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(service.jwt_secret.as_bytes()),
        )
        .unwrap();

        match service.verify_token(&token) {
            Err(ServiceError::Unauthorized(reason)) => assert_eq!(reason, "Token expired"),
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = test_service();
        assert!(service.verify_token("not-a-token").is_err());
    }
}
