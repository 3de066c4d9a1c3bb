use std::{sync::Arc, time::Duration};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{
        cookies::{extract_cookie, ACCESS_COOKIE},
        repo::UserStore,
    },
    config::JwtConfig,
    error::AppError,
};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Type discriminator carried in every token.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token payload. No claims beyond these three are emitted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }

    /// Signs `{sub, type, exp}` with `exp = now + ttl`. A negative ttl yields an
    /// already expired token.
    pub fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        ttl: TimeDuration,
    ) -> anyhow::Result<String> {
        let exp = OffsetDateTime::now_utc() + ttl;
        let claims = Claims {
            sub: user_id,
            kind,
            exp: exp.unix_timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue(user_id, TokenKind::Access, to_time(self.access_ttl))
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue(user_id, TokenKind::Refresh, to_time(self.refresh_ttl))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
                Ok(data.claims)
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::Expired),
            Err(_) => Err(TokenError::Invalid),
        }
    }

    /// Decodes and requires the given token type.
    pub fn decode_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}

fn to_time(d: Duration) -> TimeDuration {
    TimeDuration::seconds(d.as_secs() as i64)
}

/// Authenticated user id, taken from the access-token cookie. The account must
/// still be active, so tokens of a deleted user stop working immediately.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Arc<dyn UserStore>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = extract_cookie(&parts.headers, ACCESS_COOKIE).ok_or(AppError::Unauthorized)?;

        let claims = keys.decode_kind(&token, TokenKind::Access).map_err(|e| {
            warn!(reason = %e, "access token rejected");
            AppError::Unauthorized
        })?;

        let users = Arc::<dyn UserStore>::from_ref(state);
        if users.find_by_id(claims.sub).await?.is_none() {
            warn!(user_id = %claims.sub, "access token for inactive user");
            return Err(AppError::Unauthorized);
        }
        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60 * 24 * 7,
        })
    }

    #[test]
    fn default_ttls_come_from_config() {
        let keys = make_keys("dev-secret");
        assert_eq!(keys.access_ttl, Duration::from_secs(15 * 60));
        assert_eq!(keys.refresh_ttl, Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn sign_and_decode_access_token() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.decode(&token).expect("decode token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn payload_has_only_sub_type_exp() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_refresh(Uuid::new_v4()).unwrap();
        let claims = keys.decode(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        let mut fields: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        fields.sort();
        assert_eq!(fields, vec!["exp", "sub", "type"]);
        assert_eq!(json["type"], "refresh");
    }

    #[test]
    fn decode_kind_rejects_wrong_type() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_access(Uuid::new_v4()).unwrap();
        assert_eq!(
            keys.decode_kind(&token, TokenKind::Refresh).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn expired_is_distinguished_from_invalid() {
        let keys = make_keys("dev-secret");
        let token = keys
            .issue(Uuid::new_v4(), TokenKind::Access, TimeDuration::seconds(-30))
            .unwrap();
        assert_eq!(keys.decode(&token).unwrap_err(), TokenError::Expired);
        assert_eq!(keys.decode("not.a.token").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn other_secret_is_invalid() {
        let token = make_keys("one").sign_access(Uuid::new_v4()).unwrap();
        assert_eq!(make_keys("two").decode(&token).unwrap_err(), TokenError::Invalid);
    }
}
