//! Bearer-token authentication for fund requests.
//!
//! Tokens are HS256 JWTs issued by the frontend after an OAuth login. The
//! claims name the identity provider and the user's handle there.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clock skew tolerated on `exp`, in seconds.
pub const LEEWAY_SECS: u64 = 5;

/// Claims carried by a fund request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundClaims {
    pub provider: String,
    pub username: String,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorisation header is missing")]
    HeaderMissing,

    #[error("authorisation header is malformed")]
    HeaderMalformed,

    #[error("jwt token is expired")]
    Expired,

    #[error("failed to parse jwt token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to issue jwt token: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),
}

/// Verifies fund request tokens against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check an `Authorization` header value and return its claims.
    pub fn authorize(&self, header: Option<&str>) -> Result<FundClaims, AuthError> {
        let header = header.ok_or(AuthError::HeaderMissing)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::HeaderMalformed)?;
        self.verify(token)
    }

    pub fn verify(&self, token: &str) -> Result<FundClaims, AuthError> {
        decode::<FundClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(err),
            })
    }
}

/// Issue a token for `provider`/`username` valid for `ttl`.
pub fn issue_token(secret: &str, provider: &str, username: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let claims = FundClaims {
        provider: provider.to_string(),
        username: username.to_string(),
        exp: (now + ttl).as_secs(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Issue)
}
