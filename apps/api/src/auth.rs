//! JWT authentication module.
//!
//! Issues bearer tokens on login and resolves them back to a user on
//! protected routes. Logout revokes a token by its `jti`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chai_core::ports::{IssuedToken, TokenIssuer};
use chai_core::User;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

const ACCESS: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, the handle logout revokes
    pub jti: String,

    /// Token type ("access")
    pub token_type: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Generate an access token for `user_id`.
    pub fn generate_access_token(&self, user_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(claims)
    }
}

impl TokenIssuer for JwtManager {
    fn issue(&self, user: &User) -> Result<IssuedToken, String> {
        let token = self
            .generate_access_token(&user.id)
            .map_err(|e| e.to_string())?;
        Ok(IssuedToken {
            token,
            expires_in_secs: self.lifetime_secs,
        })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for routes that need a signed-in user.
///
/// Rejects with 401 when the header is missing, the token does not
/// validate, or the token was revoked by logout.
///
/// ```rust,ignore
/// async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
///     let user = state.auth().current_user(&user.user_id).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Unauthenticated."))?;
        let token =
            extract_bearer_token(header).ok_or_else(|| ApiError::unauthorized("Unauthenticated."))?;

        let claims = state.jwt().validate_access_token(token)?;
        if state.auth().is_token_revoked(&claims.jti).await? {
            return Err(ApiError::unauthorized("Token has been revoked"));
        }

        Ok(AuthUser {
            user_id: claims.sub.clone(),
            claims,
        })
    }
}
