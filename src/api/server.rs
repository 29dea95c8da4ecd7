//! HTTP API server

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::accounts::{AccountSettings, Accounts};
use crate::auth::{
    require_auth, require_role_layer, Clock, CredentialHasher, Gate, RoleGate, SessionResolver,
    SystemClock, TokenService, UserRole,
};
use crate::blocks::BlockCatalog;
use crate::config::Config;
use crate::courses::Catalog;
use crate::error::Result;
use crate::store::{DataStore, Stores};

use super::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DataStore>,
    pub gate: Gate,
    pub accounts: Accounts,
    pub catalog: Catalog,
    pub blocks: BlockCatalog,
}

impl FromRef<AppState> for Gate {
    fn from_ref(state: &AppState) -> Gate {
        state.gate.clone()
    }
}

impl AppState {
    /// Wire services over `stores` using the wall clock
    pub fn new(config: Config, stores: Stores) -> Result<Self> {
        Self::with_clock(config, stores, Arc::new(SystemClock))
    }

    /// Wire services over `stores` with an explicit time source
    pub fn with_clock(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let tokens = TokenService::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl_secs)
            .with_clock(clock);
        let gate = Gate::new(SessionResolver::new(tokens.clone(), stores.data.clone()));
        let accounts = Accounts::new(
            stores.data.clone(),
            tokens,
            CredentialHasher::new(config.auth.bcrypt_cost),
            AccountSettings::from(&config.auth),
        );

        Ok(Self {
            store: stores.data.clone(),
            gate,
            accounts,
            catalog: Catalog::new(stores.data),
            blocks: BlockCatalog::new(stores.documents),
            config: Arc::new(config),
        })
    }
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let stores = Stores::open(&config).await?;
    let state = AppState::new(config, stores)?;

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    serve(listener, state).await
}

/// Serve the API on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let authenticated = middleware::from_fn_with_state(state.gate.clone(), require_auth);
    let role = |roles: &[UserRole]| {
        middleware::from_fn_with_state(
            RoleGate::new(state.gate.clone(), roles.iter().copied()),
            require_role_layer,
        )
    };
    let teacher = role(&[UserRole::Teacher]);
    let student = role(&[UserRole::Student]);
    let staff = role(&[UserRole::Teacher, UserRole::Admin]);

    Router::new()
        .route("/", get(routes::welcome))
        .route("/api/health", get(routes::health))
        // Accounts
        .route("/main/auth/register", post(routes::auth::register))
        .route("/main/auth/login", post(routes::auth::login))
        .route("/main/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/main/auth/reset-password", post(routes::auth::reset_password))
        .route("/main/auth/me", get(routes::auth::me))
        // Users
        .route(
            "/main/users",
            get(routes::users::list_users).route_layer(authenticated.clone()),
        )
        .route(
            "/main/users/{id}",
            get(routes::users::get_user).route_layer(authenticated.clone()),
        )
        // Courses
        .route(
            "/main/courses",
            get(routes::courses::list_courses)
                .merge(post(routes::courses::create_course).route_layer(teacher.clone())),
        )
        .route(
            "/main/courses/my",
            get(routes::courses::my_courses).route_layer(teacher.clone()),
        )
        .route(
            "/main/courses/{id}",
            get(routes::courses::get_course).merge(
                axum::routing::put(routes::courses::update_course)
                    .patch(routes::courses::update_course)
                    .delete(routes::courses::delete_course)
                    .route_layer(teacher.clone()),
            ),
        )
        .route(
            "/main/courses/{id}/analytics",
            get(routes::courses::course_analytics).route_layer(staff.clone()),
        )
        .route(
            "/main/courses/{id}/enroll",
            post(routes::courses::enroll).route_layer(student.clone()),
        )
        // Student
        .route("/main/student/enrollments", get(routes::student::enrollments))
        .route("/main/student/courses", get(routes::student::available_courses))
        .route(
            "/main/student/enroll",
            post(routes::student::enroll).route_layer(student),
        )
        // Blocks
        .route(
            "/blocks",
            get(routes::blocks::list_blocks).merge(
                post(routes::blocks::create_block)
                    .put(routes::blocks::update_block)
                    .delete(routes::blocks::delete_blocks)
                    .route_layer(staff),
            ),
        )
        .route("/blocks/{id}", get(routes::blocks::get_block))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
