use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// Initialize metrics counters (call from main() for better error handling)
pub fn initialize_auth_metrics() {
    // Force lazy evaluation so every counter appears in /metrics from the
    // first scrape, not from its first increment.
    let _ = &*REGISTER_REQUESTS_TOTAL;
    let _ = &*LOGIN_REQUESTS_TOTAL;
    let _ = &*LOGIN_FAILURES_TOTAL;
    let _ = &*TOKEN_REFRESHES_TOTAL;
    let _ = &*TOKEN_REFRESH_FAILURES_TOTAL;
    let _ = &*PASSWORD_RESETS_TOTAL;
    let _ = &*RATE_LIMITED_TOTAL;
}

/// Counter for registration attempts
static REGISTER_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "register_requests_total",
        "Total number of registration requests",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create register_requests counter: {}", e);
        IntCounter::new("dummy_register", "dummy").expect("dummy counter")
    })
});

/// Counter for login attempts
static LOGIN_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("login_requests_total", "Total number of login requests")
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .unwrap_or_else(|e| {
            tracing::error!("failed to create login_requests counter: {}", e);
            IntCounter::new("dummy_login", "dummy").expect("dummy counter")
        })
});

/// Counter for rejected logins (unknown email, wrong password, unverified)
static LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "login_failures_total",
        "Total number of failed login attempts",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create login_failures counter: {}", e);
        IntCounter::new("dummy_failures", "dummy").expect("dummy counter")
    })
});

/// Counter for successful refresh-token rotations
static TOKEN_REFRESHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "token_refreshes_total",
        "Total number of successful refresh token rotations",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create token_refreshes counter: {}", e);
        IntCounter::new("dummy_refreshes", "dummy").expect("dummy counter")
    })
});

/// Counter for rejected refresh attempts (revoked, expired, replayed)
static TOKEN_REFRESH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "token_refresh_failures_total",
        "Total number of rejected refresh token attempts",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create token_refresh_failures counter: {}", e);
        IntCounter::new("dummy_refresh_failures", "dummy").expect("dummy counter")
    })
});

/// Counter for completed password resets
static PASSWORD_RESETS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "password_resets_total",
        "Total number of completed password resets",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create password_resets counter: {}", e);
        IntCounter::new("dummy_resets", "dummy").expect("dummy counter")
    })
});

/// Counter for requests refused by the fixed-window rate limiter
static RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "rate_limited_requests_total",
        "Total number of requests refused by the rate limiter",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create rate_limited_requests counter: {}", e);
        IntCounter::new("dummy_rate_limited", "dummy").expect("dummy counter")
    })
});

// Public functions to increment metrics from HTTP handlers

/// Increment register requests counter
#[inline]
pub fn inc_register_requests() {
    REGISTER_REQUESTS_TOTAL.inc();
}

/// Increment login requests counter
#[inline]
pub fn inc_login_requests() {
    LOGIN_REQUESTS_TOTAL.inc();
}

/// Increment login failures counter
#[inline]
pub fn inc_login_failures() {
    LOGIN_FAILURES_TOTAL.inc();
}

/// Increment successful token rotation counter
#[inline]
pub fn inc_token_refreshes() {
    TOKEN_REFRESHES_TOTAL.inc();
}

/// Increment rejected refresh counter
#[inline]
pub fn inc_token_refresh_failures() {
    TOKEN_REFRESH_FAILURES_TOTAL.inc();
}

/// Increment completed password reset counter
#[inline]
pub fn inc_password_resets() {
    PASSWORD_RESETS_TOTAL.inc();
}

/// Increment rate-limited request counter
#[inline]
pub fn inc_rate_limited() {
    RATE_LIMITED_TOTAL.inc();
}
