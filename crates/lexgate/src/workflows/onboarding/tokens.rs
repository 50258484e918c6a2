use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::Role;

const USER_TOKEN_DAYS: i64 = 30;
const ADMIN_TOKEN_DAYS: i64 = 7;

/// JWT payload shared by user and admin tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs and verifies HS256 tokens for every role.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    user_ttl: Duration,
    admin_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("user_ttl", &self.user_ttl)
            .field("admin_ttl", &self.admin_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            user_ttl: Duration::days(USER_TOKEN_DAYS),
            admin_ttl: Duration::days(ADMIN_TOKEN_DAYS),
        }
    }

    pub fn with_ttls(mut self, user_ttl: Duration, admin_ttl: Duration) -> Self {
        self.user_ttl = user_ttl;
        self.admin_ttl = admin_ttl;
        self
    }

    pub fn issue(&self, subject: &str, email: &str, role: Role) -> Result<String, TokenError> {
        let ttl = match role {
            Role::Admin => self.admin_ttl,
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                self.user_ttl
            }
        };
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }
}
