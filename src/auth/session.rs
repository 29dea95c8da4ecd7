//! Bearer token resolution

use std::sync::Arc;

use crate::auth::jwt::TokenService;
use crate::auth::models::User;
use crate::auth::AuthFailure;
use crate::error::Result;
use crate::store::DataStore;

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Turns a bearer header into the stored user it was issued to.
///
/// Tokens are not revoked server side: a token stays usable until it
/// expires, even if the user's role has changed since it was issued.
#[derive(Clone)]
pub struct SessionResolver {
    tokens: TokenService,
    store: Arc<dyn DataStore>,
}

impl SessionResolver {
    pub fn new(tokens: TokenService, store: Arc<dyn DataStore>) -> Self {
        Self { tokens, store }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve a header value to a user.
    ///
    /// Authentication problems come back as `Error::Auth`; store failures
    /// are returned as they are.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<User> {
        let token = bearer_token(authorization).ok_or(AuthFailure::MissingCredential)?;
        let claims = self.tokens.verify(token)?;

        match self.store.get_user_by_id(claims.subject_id).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!("Token subject {} no longer exists", claims.subject_id);
                Err(AuthFailure::UnknownSubject.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("Bearer   padded  ")), Some("padded"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
