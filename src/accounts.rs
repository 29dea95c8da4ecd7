//! Account lifecycle: registration, login and password reset

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::models::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, NewUser, RegisterRequest,
    ResetPasswordRequest, User, UserInfo, UserUpdate,
};
use crate::auth::{AuthFailure, CredentialHasher, SessionClaims, TokenService};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::validation;

/// Reply to a forgot-password request. The visible outcome is the same
/// whether or not the email belongs to an account.
#[derive(Debug, Clone, Default)]
pub struct ResetRequested {
    /// Only set when reset tokens are exposed for development
    pub debug_token: Option<String>,
}

/// Longest configurable reset-token lifetime (30 days)
pub const MAX_RESET_TOKEN_TTL_HOURS: i64 = 30 * 24;

#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub reset_token_ttl_hours: i64,
    pub expose_reset_token: bool,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            reset_token_ttl_hours: 24,
            expose_reset_token: false,
        }
    }
}

impl From<&AuthConfig> for AccountSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            reset_token_ttl_hours: config.reset_token_ttl_hours,
            expose_reset_token: config.expose_reset_token,
        }
    }
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn DataStore>,
    tokens: TokenService,
    hasher: CredentialHasher,
    settings: AccountSettings,
}

impl Accounts {
    pub fn new(
        store: Arc<dyn DataStore>,
        tokens: TokenService,
        hasher: CredentialHasher,
        settings: AccountSettings,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
            settings,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account and sign the new user in
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        let name = validation::required(req.name.as_deref(), "Name is required")?.to_string();
        let email = validation::validate_email(req.email.as_deref())?.to_string();
        let password = validation::validate_password(req.password.as_deref(), None)?;
        let role = validation::registration_role(req.role.as_deref())?;
        let gender = validation::parse_gender(req.gender.as_deref())?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let mut new_user = NewUser::new(name, email, self.hasher.hash_blocking(password).await?, role);
        new_user.phone = non_empty(req.phone);
        new_user.birth_date = req.birth_date;
        new_user.gender = gender;
        new_user.grade = non_empty(req.grade);
        new_user.school = non_empty(req.school);
        new_user.teaching_subject = non_empty(req.teaching_subject);
        new_user.child_grade = non_empty(req.child_grade);
        new_user.verification_token = Some(Uuid::new_v4().to_string());

        let user = self.store.insert_user(new_user).await?;
        if !req.interested_subjects.is_empty() {
            self.store
                .add_user_subjects(user.id, &req.interested_subjects)
                .await?;
        }

        tracing::info!("Registered user {} with role {}", user.id, user.role);
        self.sign_in(user).await
    }

    /// Exchange credentials for a token.
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let (email, password) = match (req.email.as_deref(), req.password.as_deref()) {
            (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
            _ => return Err(AuthFailure::MalformedRequest.into()),
        };

        let user = match self.store.get_user_by_email(email).await? {
            Some(user) if self.hasher.verify_blocking(password, &user.password).await? => user,
            _ => {
                tracing::warn!("Failed login attempt");
                return Err(AuthFailure::InvalidCredentials.into());
            }
        };

        tracing::info!("User {} logged in", user.id);
        self.sign_in(user).await
    }

    /// Current user's profile with interested subjects
    pub async fn profile(&self, user: User) -> Result<UserInfo> {
        let subjects = self.store.list_user_subjects(user.id).await?;
        Ok(UserInfo::from(user).with_subjects(subjects))
    }

    /// Issue a reset token for the account, if there is one
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<ResetRequested> {
        let email = validation::validate_email(req.email.as_deref())?;

        let Some(user) = self.store.get_user_by_email(email).await? else {
            return Ok(ResetRequested::default());
        };

        let token = Uuid::new_v4().to_string();
        let expiry = reset_expiry(self.tokens.clock().now(), self.settings.reset_token_ttl_hours)?;
        self.store
            .update_user(
                user.id,
                UserUpdate {
                    reset_token: Some(Some(token.clone())),
                    reset_token_expiry: Some(Some(expiry)),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!("Issued password reset token for user {}", user.id);
        Ok(ResetRequested {
            debug_token: self.settings.expose_reset_token.then_some(token),
        })
    }

    /// Replace the password of the account holding a live reset token
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<()> {
        let token = validation::required(req.token.as_deref(), "Token is required")?;
        let password =
            validation::validate_password(req.password.as_deref(), req.confirm_password.as_deref())?;

        let now = self.tokens.clock().now();
        let user = self
            .store
            .get_user_by_reset_token(token, now)
            .await?
            .ok_or_else(|| Error::validation("Invalid or expired token"))?;

        self.store
            .update_user(
                user.id,
                UserUpdate {
                    password: Some(self.hasher.hash_blocking(password).await?),
                    reset_token: Some(None),
                    reset_token_expiry: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!("Password reset for user {}", user.id);
        Ok(())
    }

    async fn sign_in(&self, user: User) -> Result<AuthResponse> {
        let claims = SessionClaims::for_subject(user.id)
            .with_claim("email", user.email.clone())
            .with_claim("role", user.role.as_str());
        let token = self.tokens.issue(&claims)?;
        let user = self.profile(user).await?;
        Ok(AuthResponse { token, user })
    }
}

fn reset_expiry(now: DateTime<Utc>, ttl_hours: i64) -> Result<DateTime<Utc>> {
    Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            Error::Config(format!("reset token lifetime of {} hours is out of range", ttl_hours))
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
