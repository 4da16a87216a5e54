use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, state::AppState};

/// Lifetime of every issued token. There is no refresh path.
pub const TOKEN_TTL: Duration = Duration::hours(1);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Holds JWT signing and verification keys.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_secret(&state.config.jwt.secret)
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign(&self, user_id: Uuid, is_admin: bool) -> anyhow::Result<String> {
        self.sign_at(user_id, is_admin, OffsetDateTime::now_utc())
    }

    fn sign_at(
        &self,
        user_id: Uuid,
        is_admin: bool,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = issued_at + TOKEN_TTL;
        let claims = Claims {
            user_id,
            is_admin,
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(user_id = %data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::from_secret("dev-secret")
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, false).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.user_id, user_id);
        assert!(!claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn admin_flag_is_carried() {
        let keys = keys();
        let token = keys.sign(Uuid::new_v4(), true).expect("sign");
        assert!(keys.verify(&token).unwrap().is_admin);
    }

    #[test]
    fn payload_uses_camel_case_names() {
        let claims = Claims {
            user_id: Uuid::nil(),
            is_admin: true,
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["isAdmin"], true);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - Duration::hours(2);
        let token = keys.sign_at(Uuid::new_v4(), false, issued).expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let token = JwtKeys::from_secret("other-secret")
            .sign(Uuid::new_v4(), false)
            .expect("sign");
        assert_eq!(keys().verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let keys = keys();
        let token = keys.sign(Uuid::new_v4(), false).expect("sign");
        let forged = JwtKeys::from_secret("dev-secret")
            .sign(Uuid::new_v4(), true)
            .expect("sign");
        // Splice the admin payload onto the original signature.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let spliced = parts.join(".");
        assert_eq!(keys.verify(&spliced).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(keys().verify("not.a.jwt").unwrap_err(), TokenError::Invalid);
        assert_eq!(keys().verify("").unwrap_err(), TokenError::Invalid);
    }
}
