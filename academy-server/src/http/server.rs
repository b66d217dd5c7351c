//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use academy_core::AcademyConfig;
use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::JwtKeys;
use super::routes;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    /// Origins allowed when not permissive (default: localhost:3000/3030)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            allowed_origins: [
                "http://localhost:3000",
                "http://localhost:3030",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:3030",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl From<&AcademyConfig> for ServerConfig {
    fn from(config: &AcademyConfig) -> Self {
        Self {
            bind_addr: config.server.bind,
            cors_permissive: config.server.cors_permissive,
            allowed_origins: config.server.allowed_origins.clone(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    /// Gamification rules, quiz policy and timezone
    pub config: AcademyConfig,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(pool: PgPool, config: AcademyConfig) -> Result<Self, ServerError> {
        let secret = config
            .jwt_secret()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let jwt = JwtKeys::new(secret, config.auth.leeway_seconds);
        Ok(Self { pool, config, jwt })
    }
}

/// All routes without middleware, for tests and `run_server`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::courses::router())
        .merge(routes::enrollments::router())
        .merge(routes::lessons::router())
        .merge(routes::quizzes::router())
        .merge(routes::certificates::router())
        .merge(routes::gamification::router())
        .merge(routes::paths::router())
        .merge(routes::instructor::router())
        .merge(routes::admin::router())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, ServerError> {
    if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ServerError::Config(format!("invalid CORS origin '{}'", origin)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&database_url).await?;
/// let state = AppState::new(pool, academy_config)?;
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let cors = cors_layer(&config)?;
    tracing::info!(
        timezone = %state.config.gamification.timezone,
        cooldown_minutes = state.config.quiz.retry_cooldown_minutes,
        "progression rules loaded"
    );

    let app = router(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn server_config_follows_academy_config() {
        let mut academy = AcademyConfig::default();
        academy.server.cors_permissive = true;
        academy.server.allowed_origins = vec!["https://learn.example.com".into()];

        let config = ServerConfig::from(&academy);
        assert!(config.cors_permissive);
        assert_eq!(config.allowed_origins.len(), 1);
    }

    #[test]
    fn bad_origin_is_a_config_error() {
        let config = ServerConfig {
            allowed_origins: vec!["bad\norigin".into()],
            ..ServerConfig::default()
        };
        assert!(matches!(cors_layer(&config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn state_requires_jwt_secret() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/academy_test")
            .unwrap();
        let result = AppState::new(pool, AcademyConfig::default());
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
