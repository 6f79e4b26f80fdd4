//! Caller identity and scope enforcement.
//!
//! Token issuance, refresh rotation, and password handling live in the
//! identity service; this module only verifies HS256 bearer tokens and
//! exposes the `{user_id, role, store_id, merchant_id}` tuple the
//! stock-mutation core needs for authorization decisions.

use crate::entities::store;
use crate::errors::ServiceError;
use crate::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Caller roles, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Clerk,
    Admin,
    Superuser,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::Clerk => 0,
            Role::Admin => 1,
            Role::Superuser => 2,
        }
    }
}

/// Claim structure for bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<i64>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(
        user_id: i64,
        role: Role,
        store_id: Option<i64>,
        merchant_id: Option<i64>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            store_id,
            merchant_id,
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

/// Encodes a token for the given claims. Used by the identity service and
/// by the integration test harness.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, ServiceError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("Failed to encode token: {}", e)))
}

fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))?;
    Ok(data.claims)
}

/// Authenticated caller identity extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: Role,
    pub store_id: Option<i64>,
    pub merchant_id: Option<i64>,
}

impl AuthenticatedUser {
    /// Rejects callers below the given role.
    pub fn require_role(&self, minimum: Role) -> Result<(), ServiceError> {
        if self.role.rank() < minimum.rank() {
            return Err(ServiceError::Forbidden(format!(
                "Requires {} role or higher",
                minimum
            )));
        }
        Ok(())
    }

    /// Verifies the caller may act on the given store.
    ///
    /// Clerks and admins are pinned to their own store; superusers may act
    /// on any store owned by their merchant account.
    pub async fn ensure_store_scope<C: ConnectionTrait>(
        &self,
        conn: &C,
        store_id: i64,
    ) -> Result<(), ServiceError> {
        match self.role {
            Role::Clerk | Role::Admin => {
                if self.store_id != Some(store_id) {
                    return Err(ServiceError::Forbidden(
                        "Store is outside your scope".to_string(),
                    ));
                }
                Ok(())
            }
            Role::Superuser => {
                let store = store::Entity::find_by_id(store_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))?;
                if store.merchant_id != self.user_id {
                    return Err(ServiceError::Forbidden(
                        "Store is not in your account".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            store_id: claims.store_id,
            merchant_id: claims.merchant_id,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing authorization header".to_string())
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| {
                ServiceError::Unauthorized("Invalid authorization header format".to_string())
            })?;

        let claims = decode_token(token, &state.config.jwt_secret)?;
        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

    #[test]
    fn token_round_trip_preserves_identity() {
        let claims = Claims::new(7, Role::Admin, Some(3), None, 3600);
        let token = issue_token(&claims, SECRET).unwrap();
        let decoded = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.store_id, Some(3));
    }

    #[test]
    fn tampered_secret_is_rejected() {
        let claims = Claims::new(7, Role::Clerk, Some(3), None, 3600);
        let token = issue_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, "another_secret_that_is_long_enough_xx").is_err());
    }

    #[test]
    fn role_ordering_gates_privileged_operations() {
        let clerk = AuthenticatedUser {
            user_id: 1,
            role: Role::Clerk,
            store_id: Some(1),
            merchant_id: None,
        };
        assert!(clerk.require_role(Role::Clerk).is_ok());
        assert!(clerk.require_role(Role::Admin).is_err());

        let superuser = AuthenticatedUser {
            user_id: 2,
            role: Role::Superuser,
            store_id: None,
            merchant_id: None,
        };
        assert!(superuser.require_role(Role::Admin).is_ok());
    }
}
