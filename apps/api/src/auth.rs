//! JWT authentication module.
//!
//! Issues and validates bearer tokens and turns them into [`CurrentUser`].
//!
//! ## Token Flow
//! ```text
//! POST /api/auth/login ──► JwtManager::issue(user, None) ──► token (+ cookie)
//! POST /api/auth/select-store ──► JwtManager::issue(user, Some(store)) ──► new token
//!
//! request ──► Authorization: Bearer <jwt>  ─┐
//!         └─► Cookie: token=<jwt>          ─┴─► CurrentUser { id, role, store_id }
//! ```
//!
//! The selected store travels inside the token, so every store-scoped
//! handler reads it from [`CurrentUser::require_store`].

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use stockroom_core::{Role, User};

use crate::error::ApiError;
use crate::AppState;

/// Name of the cookie carrying the token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Store selected for this session
    pub store_id: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
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

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issues a token for a user, optionally bound to a store.
    pub fn issue(&self, user: &User, store_id: Option<&str>) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            store_id: store_id.map(str::to_string),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract a named cookie from a `Cookie` header.
pub fn extract_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

/// `Set-Cookie` value carrying a fresh token.
pub fn token_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value that clears the token.
pub fn clear_token_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", TOKEN_COOKIE)
}

fn token_from_parts(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);

    bearer.or_else(|| {
        parts
            .headers
            .get(COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|cookies| extract_cookie(cookies, TOKEN_COOKIE))
    })
}

// =============================================================================
// Current User
// =============================================================================

/// Authenticated caller, decoded from the token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub store_id: Option<String>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            store_id: claims.store_id,
        }
    }
}

impl CurrentUser {
    /// The selected store, or 400 "No store selected".
    pub fn require_store(&self) -> Result<&str, ApiError> {
        self.store_id
            .as_deref()
            .ok_or_else(ApiError::no_store_selected)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require(self.role.is_admin())
    }

    /// Admin or manager.
    pub fn require_manager(&self) -> Result<(), ApiError> {
        self.require(self.role.can_manage())
    }

    /// Admin, manager or employee.
    pub fn require_inventory(&self) -> Result<(), ApiError> {
        self.require(self.role.can_edit_inventory())
    }

    fn require(&self, allowed: bool) -> Result<(), ApiError> {
        if allowed {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Permission denied");
            Err(ApiError::forbidden())
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let Some(token) = token_from_parts(parts) else {
            warn!(uri = %parts.uri, "Missing authentication token");
            return Err(ApiError::unauthorized());
        };

        let claims = state.jwt.validate_token(token).map_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Token rejected");
            e
        })?;

        let user = CurrentUser::from(claims);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// `Option<CurrentUser>`: absent token is `None`, a bad token still rejects.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if token_from_parts(parts).is_none() {
            return Ok(None);
        }
        <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "user-1".to_string(),
            name: "Test".to_string(),
            email: "test@shop.io".to_string(),
            password_hash: String::new(),
            role,
            department_id: None,
            is_active: true,
            last_login_at: None,
            stores: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.issue(&user(Role::Manager), Some("store-1")).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.store_id.as_deref(), Some("store-1"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);

        let token = issuer.issue(&user(Role::Admin), None).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret".to_string(), -3600);
        let token = manager.issue(&user(Role::Admin), None).unwrap();

        match manager.validate_token(&token) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("unexpected {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);

        assert_eq!(extract_cookie("theme=dark; token=xyz", "token"), Some("xyz"));
        assert_eq!(extract_cookie("token=", "token"), None);
        assert_eq!(extract_cookie("mytoken=1", "token"), None);
    }

    #[test]
    fn test_role_gates() {
        let cashier = CurrentUser {
            id: "u".into(),
            email: "c@shop.io".into(),
            role: Role::Cashier,
            store_id: None,
        };
        assert!(cashier.require_inventory().is_err());
        assert!(cashier.require_manager().is_err());
        assert!(matches!(cashier.require_store(), Err(ApiError::BadRequest(_))));

        let manager = CurrentUser {
            role: Role::Manager,
            store_id: Some("s1".into()),
            ..cashier
        };
        assert!(manager.require_manager().is_ok());
        assert!(manager.require_admin().is_err());
        assert_eq!(manager.require_store().unwrap(), "s1");
    }
}
