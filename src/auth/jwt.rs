//! JWT token handling

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::AuthFailure;
use crate::error::{Error, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Longest configurable token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 86_400;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    #[serde(rename = "userId")]
    pub subject_id: i64,
    /// Issued at
    #[serde(default)]
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Any other claims carried by the token (email, role, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    /// Claims for a subject; timestamps are filled in at issue time
    pub fn for_subject(subject_id: i64) -> Self {
        Self {
            subject_id,
            iat: 0,
            exp: 0,
            extra: Map::new(),
        }
    }

    /// Attach an additional claim
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn email(&self) -> Option<&str> {
        self.claim("email").and_then(Value::as_str)
    }

    /// Check if token is expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}

/// Sign claims, stamping `iat = now` and `exp = now + ttl_secs`
pub fn issue_token(claims: &SessionClaims, secret: &[u8], ttl_secs: i64, now: i64) -> Result<String> {
    let mut claims = claims.clone();
    claims.iat = now;
    claims.exp = now.checked_add(ttl_secs).ok_or_else(|| {
        Error::Config(format!("token lifetime of {} seconds is out of range", ttl_secs))
    })?;

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Validate and decode a token against `secret` at time `now` (unix seconds).
///
/// The signature is checked first; expiry has no grace window.
pub fn verify_token(
    token: &str,
    secret: &[u8],
    now: i64,
) -> std::result::Result<SessionClaims, AuthFailure> {
    let claims = decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation())
        .map(|data| data.claims)
        .map_err(|e| classify(e.kind()))?;

    if claims.is_expired_at(now) {
        return Err(AuthFailure::Expired);
    }

    Ok(claims)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    // Expiry is checked against the injected clock instead
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp"]);
    validation
}

fn classify(kind: &ErrorKind) -> AuthFailure {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthFailure::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthFailure::Expired,
        _ => AuthFailure::Malformed,
    }
}

/// Issues and verifies tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<[u8]>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl_secs,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create a token with the configured lifetime
    pub fn issue(&self, claims: &SessionClaims) -> Result<String> {
        self.issue_with_ttl(claims, self.ttl_secs)
    }

    pub fn issue_with_ttl(&self, claims: &SessionClaims, ttl_secs: i64) -> Result<String> {
        issue_token(claims, &self.secret, ttl_secs, self.clock.timestamp())
    }

    pub fn verify(&self, token: &str) -> std::result::Result<SessionClaims, AuthFailure> {
        verify_token(token, &self.secret, self.clock.timestamp())
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
