/// Aegis Auth Service - Main entry point
///
/// Starts the REST API with:
/// - PostgreSQL connection pool (durable user and token store)
/// - Redis connection manager (revocation cache and rate limiting)
/// - SMTP email service (no-op mode without SMTP_HOST)
/// - Prometheus metrics and Swagger UI
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, patch, post},
    Router,
};
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use aegis_auth_service::{
    config::Settings,
    handlers::{admin, auth, users},
    metrics,
    middleware::RateLimiter,
    openapi::ApiDoc,
    security::TokenCodec,
    services::{AuthService, EmailService},
    store::{PgTokenStore, PgUserStore, RedisRevocationCache},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aegis_auth_service=info,info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting Aegis Auth Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    let settings = Arc::new(settings);
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(
            settings.database.acquire_timeout_seconds,
        ))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // Initialize Redis connection
    let redis_client =
        redis::Client::open(settings.redis.url.clone()).context("Invalid REDIS_URL")?;
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connection manager initialized");

    // Initialize email service
    let email_service =
        EmailService::new(&settings.email).context("Failed to initialize email service")?;
    if email_service.is_enabled() {
        info!("Email service initialized with SMTP");
    } else {
        info!("Email service running in no-op mode (SMTP not configured)");
    }

    // Token codec fixed at process start
    let codec = TokenCodec::new(&settings.jwt).context("Failed to initialize token codec")?;

    let user_store = PgUserStore::new(db_pool.clone());
    let token_store = PgTokenStore::new(db_pool.clone());
    let revocation_cache = RedisRevocationCache::new(redis_conn.clone());
    let rate_limiter = RateLimiter::new(redis_conn, settings.rate_limit.window_seconds);

    let auth_service = AuthService::new(
        user_store.clone(),
        token_store,
        revocation_cache,
        codec.clone(),
        email_service,
        &settings,
    );

    // Register metric counters before the first request
    metrics::initialize_auth_metrics();

    let state = AppState {
        settings: settings.clone(),
        codec,
        auth: auth_service,
        users: user_store,
        rate_limiter,
    };

    // Build REST API router
    let app = Router::new()
        // Authentication endpoints
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/verify-email", post(auth::verify_email))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route(
            "/api/v1/auth/password-reset/request",
            post(auth::password_reset_request),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(auth::password_reset_confirm),
        )
        // Current-user endpoints
        .route(
            "/api/v1/users/me",
            get(users::get_me).patch(users::update_me),
        )
        // Admin endpoints
        .route("/api/v1/admin/users", get(admin::list_users))
        .route(
            "/api/v1/admin/users/:user_id/role",
            patch(admin::update_user_role),
        )
        // Health check
        .route("/health", get(health_check))
        .route("/readiness", get(readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = TcpListener::bind(&addr)
        .await
        .context("Failed to bind server address")?;
    info!("REST API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Auth service shutdown complete");

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness_check() -> &'static str {
    "READY"
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
