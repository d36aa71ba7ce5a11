//! Contactdesk API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Session login, logout and inspection
//! - Authorization of protected contact endpoints
//! - Anonymous contact submissions
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use contactdesk_common::{
    auth::{Authenticator, SessionCookie, StaticCredentials},
    config::{AppConfig, CorsConfig, ObservabilityConfig},
    db::DbPool,
    kv,
    metrics,
    session::SessionManager,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub sessions: Arc<SessionManager>,
    pub authenticator: Arc<dyn Authenticator>,
    pub cookie: SessionCookie,
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for SessionCookie {
    fn from_ref(state: &AppState) -> Self {
        state.cookie.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting Contactdesk API Gateway v{}", contactdesk_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Metrics exporter listening on {}", addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    db.ensure_schema().await?;

    // One session store client for the whole process
    let backend = kv::create_backend(&config.redis)?;
    let sessions = Arc::new(SessionManager::from_config(
        &config.session,
        &config.redis,
        backend,
    )?);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db: db.clone(),
        sessions: sessions.clone(),
        authenticator: Arc::new(StaticCredentials::from_config(&config.auth)),
        cookie: SessionCookie::from_config(&config.session),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let signalled = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let signalled = signalled.clone();
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        }
    });

    serve_with_drain_limit(
        server.into_future(),
        &signalled,
        config.server.shutdown_timeout(),
    )
    .await?;

    // Release shared connections once in-flight requests have drained
    sessions.shutdown().await;
    db.close().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Session endpoints
        .route("/login", post(handlers::sessions::login))
        .route("/logout", post(handlers::sessions::logout))
        .route("/session", get(handlers::sessions::session_info))
        .route("/session/extend", post(handlers::sessions::extend_session))

        // Contact endpoints (reads require a session, submission does not)
        .route(
            "/contactus",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route("/contactus/{id}", get(handlers::contacts::get_contact))
        .route_layer(axum::middleware::from_fn(
            middleware::request_metrics::track_metrics,
        ));

    // Compose the app
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Credentialed CORS: explicit origins when configured, otherwise the caller's own
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Run the server to completion, but stop waiting for in-flight requests
/// `drain` after the shutdown signal fires
async fn serve_with_drain_limit<F>(
    server: F,
    signalled: &Notify,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = signalled.notified() => {}
    }

    match tokio::time::timeout(drain, server).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                timeout_secs = drain.as_secs(),
                "Requests still in flight at shutdown timeout, abandoning them"
            );
            Ok(())
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests;
