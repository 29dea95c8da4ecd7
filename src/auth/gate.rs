//! Authorization gate
//!
//! A gate first resolves the caller (`Unauthenticated -> Authenticated`) and
//! then asks a [`Guard`] whether the caller may proceed
//! (`Authenticated -> Authorized`). Any failed step ends the request.
//!
//! Guards are plain values with no interior state, so one instance can be
//! shared by every request. Role and ownership checks are separate guards;
//! an admin only gets past an ownership check when the caller composes the
//! two with [`either`].

use std::future::Future;

use crate::auth::models::{User, UserRole};
use crate::auth::session::SessionResolver;
use crate::auth::AuthFailure;
use crate::error::{Error, Result};

/// A single access decision over an authenticated user and a resource
pub trait Guard<R: ?Sized = ()>: Send + Sync {
    fn check(&self, user: &User, resource: &R) -> std::result::Result<(), AuthFailure>;
}

/// Passes every authenticated user
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

impl<R: ?Sized> Guard<R> for Authenticated {
    fn check(&self, _user: &User, _resource: &R) -> std::result::Result<(), AuthFailure> {
        Ok(())
    }
}

/// Passes users whose role is in the allowed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: Vec<UserRole>,
}

impl RoleGuard {
    pub fn allowed(&self) -> &[UserRole] {
        &self.allowed
    }
}

impl<R: ?Sized> Guard<R> for RoleGuard {
    fn check(&self, user: &User, _resource: &R) -> std::result::Result<(), AuthFailure> {
        if self.allowed.contains(&user.role) {
            Ok(())
        } else {
            Err(AuthFailure::InsufficientRole)
        }
    }
}

pub fn require_role(allowed: impl IntoIterator<Item = UserRole>) -> RoleGuard {
    RoleGuard {
        allowed: allowed.into_iter().collect(),
    }
}

/// Passes when the user's id equals the owner id derived from the resource
#[derive(Clone, Copy)]
pub struct OwnerGuard<F> {
    owner_of: F,
}

impl<R, F> Guard<R> for OwnerGuard<F>
where
    R: ?Sized,
    F: Fn(&R) -> Option<i64> + Send + Sync,
{
    fn check(&self, user: &User, resource: &R) -> std::result::Result<(), AuthFailure> {
        match (self.owner_of)(resource) {
            Some(owner_id) if owner_id == user.id => Ok(()),
            _ => Err(AuthFailure::NotOwner),
        }
    }
}

pub fn require_owner<F>(owner_of: F) -> OwnerGuard<F> {
    OwnerGuard { owner_of }
}

/// Both guards must pass
#[derive(Debug, Clone, Copy)]
pub struct Both<A, B>(A, B);

impl<R: ?Sized, A: Guard<R>, B: Guard<R>> Guard<R> for Both<A, B> {
    fn check(&self, user: &User, resource: &R) -> std::result::Result<(), AuthFailure> {
        self.0.check(user, resource)?;
        self.1.check(user, resource)
    }
}

pub fn both<A, B>(first: A, second: B) -> Both<A, B> {
    Both(first, second)
}

/// Either guard may pass; the second guard's failure is reported
#[derive(Debug, Clone, Copy)]
pub struct Either<A, B>(A, B);

impl<R: ?Sized, A: Guard<R>, B: Guard<R>> Guard<R> for Either<A, B> {
    fn check(&self, user: &User, resource: &R) -> std::result::Result<(), AuthFailure> {
        self.0
            .check(user, resource)
            .or_else(|_| self.1.check(user, resource))
    }
}

pub fn either<A, B>(first: A, second: B) -> Either<A, B> {
    Either(first, second)
}

/// Result of running a request through a gate
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The request may proceed
    Passed(T),
    /// 401-equivalent
    Unauthenticated(AuthFailure),
    /// 403-equivalent
    Forbidden(AuthFailure),
}

impl<T> Outcome<T> {
    pub fn from_failure(failure: AuthFailure) -> Self {
        if failure.is_authorization() {
            Outcome::Forbidden(failure)
        } else {
            Outcome::Unauthenticated(failure)
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed(_))
    }

    pub fn failure(&self) -> Option<AuthFailure> {
        match self {
            Outcome::Passed(_) => None,
            Outcome::Unauthenticated(f) | Outcome::Forbidden(f) => Some(*f),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Passed(value) => Outcome::Passed(f(value)),
            Outcome::Unauthenticated(failure) => Outcome::Unauthenticated(failure),
            Outcome::Forbidden(failure) => Outcome::Forbidden(failure),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, AuthFailure> {
        match self {
            Outcome::Passed(value) => Ok(value),
            Outcome::Unauthenticated(failure) | Outcome::Forbidden(failure) => Err(failure),
        }
    }
}

/// Decide a request from an already resolved caller
pub fn decide<R, G>(
    resolved: std::result::Result<User, AuthFailure>,
    guard: &G,
    resource: &R,
) -> Outcome<User>
where
    R: ?Sized,
    G: Guard<R> + ?Sized,
{
    match resolved {
        Ok(user) => match guard.check(&user, resource) {
            Ok(()) => Outcome::Passed(user),
            Err(failure) => Outcome::Forbidden(failure),
        },
        Err(failure) => Outcome::from_failure(failure),
    }
}

/// Resolver plus guards, shared by every request
#[derive(Clone)]
pub struct Gate {
    resolver: SessionResolver,
}

impl Gate {
    pub fn new(resolver: SessionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &SessionResolver {
        &self.resolver
    }

    /// Resolve the caller; store failures escape as `Err`
    pub async fn require_authenticated(&self, authorization: Option<&str>) -> Result<Outcome<User>> {
        self.authorize(authorization, &Authenticated, &()).await
    }

    /// Resolve the caller and apply `guard` to `resource`
    pub async fn authorize<R, G>(
        &self,
        authorization: Option<&str>,
        guard: &G,
        resource: &R,
    ) -> Result<Outcome<User>>
    where
        R: ?Sized,
        G: Guard<R> + ?Sized,
    {
        let resolved = match self.resolver.resolve(authorization).await {
            Ok(user) => Ok(user),
            Err(Error::Auth(failure)) => Err(failure),
            Err(e) => return Err(e),
        };

        let outcome = decide(resolved, guard, resource);
        if let Some(failure) = outcome.failure() {
            tracing::warn!("Request rejected at gate: {:?}", failure);
        }
        Ok(outcome)
    }

    /// Run `handler` with the caller when the gate passes
    pub async fn run<R, G, H, Fut, T>(
        &self,
        authorization: Option<&str>,
        guard: &G,
        resource: &R,
        handler: H,
    ) -> Result<Outcome<T>>
    where
        R: ?Sized,
        G: Guard<R> + ?Sized,
        H: FnOnce(User) -> Fut,
        Fut: Future<Output = T>,
    {
        match self.authorize(authorization, guard, resource).await? {
            Outcome::Passed(user) => Ok(Outcome::Passed(handler(user).await)),
            Outcome::Unauthenticated(failure) => Ok(Outcome::Unauthenticated(failure)),
            Outcome::Forbidden(failure) => Ok(Outcome::Forbidden(failure)),
        }
    }
}
