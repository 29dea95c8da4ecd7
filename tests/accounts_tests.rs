//! Account lifecycle tests against the in-memory store
//!
//! Run with: cargo test --test accounts_tests

use chrono::{Duration, Utc};
use std::sync::Arc;

use waiedu::accounts::{AccountSettings, Accounts};
use waiedu::auth::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use waiedu::auth::{AuthFailure, CredentialHasher, ManualClock, TokenService, UserRole};
use waiedu::error::Error;
use waiedu::store::{DataStore, MemoryStore};

struct Harness {
    accounts: Accounts,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = TokenService::new("accounts-secret", 3600).with_clock(clock.clone());
    let accounts = Accounts::new(
        store.clone(),
        tokens,
        CredentialHasher::new(4),
        AccountSettings {
            reset_token_ttl_hours: 1,
            expose_reset_token: true,
        },
    );
    Harness {
        accounts,
        store,
        clock,
    }
}

fn registration(email: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        email: Some(email.to_string()),
        password: Some("s3cret-pass".to_string()),
        name: Some("Nguyen Van A".to_string()),
        role: role.map(str::to_string),
        ..Default::default()
    }
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let h = harness();

    let registered = h
        .accounts
        .register(registration("a@x.io", Some("teacher")))
        .await
        .unwrap();
    assert_eq!(registered.user.role, UserRole::Teacher);
    assert!(!registered.user.is_verified);

    let session = h.accounts.login(login("a@x.io", "s3cret-pass")).await.unwrap();
    assert_eq!(session.user.id, registered.user.id);

    let claims = h.accounts.tokens().verify(&session.token).unwrap();
    assert_eq!(claims.subject_id, registered.user.id);
    assert_eq!(claims.email(), Some("a@x.io"));
    assert_eq!(claims.claim("role").and_then(|v| v.as_str()), Some("teacher"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    h.accounts
        .register(registration("a@x.io", None))
        .await
        .unwrap();

    let wrong_password = h
        .accounts
        .login(login("a@x.io", "not-the-password"))
        .await
        .unwrap_err();
    let unknown_email = h
        .accounts
        .login(login("nobody@x.io", "s3cret-pass"))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), "Invalid credentials");
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(
        wrong_password.auth_failure(),
        Some(AuthFailure::InvalidCredentials)
    );
    assert_eq!(
        unknown_email.auth_failure(),
        Some(AuthFailure::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let h = harness();
    let err = h
        .accounts
        .login(LoginRequest {
            email: Some("a@x.io".to_string()),
            password: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.auth_failure(), Some(AuthFailure::MalformedRequest));
}

#[tokio::test]
async fn test_registration_validation() {
    let h = harness();

    let err = h
        .accounts
        .register(registration("not-an-email", None))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid email format");

    let err = h
        .accounts
        .register(registration("a@x.io", Some("admin")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Role must be one of: student, teacher, parent");

    let mut short = registration("a@x.io", None);
    short.password = Some("short".to_string());
    let err = h.accounts.register(short).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    h.accounts
        .register(registration("a@x.io", None))
        .await
        .unwrap();
    let err = h
        .accounts
        .register(registration("a@x.io", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(ref m) if m == "Email already registered"));
}

#[tokio::test]
async fn test_interested_subjects_show_in_profile() {
    let h = harness();
    h.store.add_subject("math", "Mathematics").await;

    let mut req = registration("a@x.io", None);
    req.interested_subjects = vec!["math".to_string(), "unknown".to_string()];
    let registered = h.accounts.register(req).await.unwrap();

    assert_eq!(registered.user.subjects.len(), 1);
    assert_eq!(registered.user.subjects[0].name, "Mathematics");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let h = harness();
    h.accounts
        .register(registration("a@x.io", None))
        .await
        .unwrap();

    let requested = h
        .accounts
        .forgot_password(ForgotPasswordRequest {
            email: Some("a@x.io".to_string()),
        })
        .await
        .unwrap();
    let token = requested.debug_token.expect("token exposed in tests");

    let mismatch = h
        .accounts
        .reset_password(ResetPasswordRequest {
            token: Some(token.clone()),
            password: Some("brand-new-pass".to_string()),
            confirm_password: Some("different-pass".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(mismatch.to_string(), "Passwords do not match");

    h.accounts
        .reset_password(ResetPasswordRequest {
            token: Some(token.clone()),
            password: Some("brand-new-pass".to_string()),
            confirm_password: Some("brand-new-pass".to_string()),
        })
        .await
        .unwrap();

    assert!(h.accounts.login(login("a@x.io", "s3cret-pass")).await.is_err());
    assert!(h.accounts.login(login("a@x.io", "brand-new-pass")).await.is_ok());

    // Tokens are single use
    let reused = h
        .accounts
        .reset_password(ResetPasswordRequest {
            token: Some(token),
            password: Some("another-pass".to_string()),
            confirm_password: None,
        })
        .await
        .unwrap_err();
    assert_eq!(reused.to_string(), "Invalid or expired token");
}

#[tokio::test]
async fn test_reset_token_expires() {
    let h = harness();
    let registered = h
        .accounts
        .register(registration("a@x.io", None))
        .await
        .unwrap();

    let token = h
        .accounts
        .forgot_password(ForgotPasswordRequest {
            email: Some("a@x.io".to_string()),
        })
        .await
        .unwrap()
        .debug_token
        .unwrap();

    let stored = h.store.get_user_by_id(registered.user.id).await.unwrap().unwrap();
    assert_eq!(stored.reset_token.as_deref(), Some(token.as_str()));

    h.clock.advance(Duration::hours(2));
    let err = h
        .accounts
        .reset_password(ResetPasswordRequest {
            token: Some(token),
            password: Some("brand-new-pass".to_string()),
            confirm_password: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid or expired token");
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email() {
    let h = harness();
    let requested = h
        .accounts
        .forgot_password(ForgotPasswordRequest {
            email: Some("nobody@x.io".to_string()),
        })
        .await
        .unwrap();
    assert!(requested.debug_token.is_none());
}
