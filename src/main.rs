//! Listing credits service entry point.
//!
//! Composition root: loads configuration, wires the Postgres adapters and the
//! Stripe gateway into the HTTP router, and runs the expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use listing_credits::adapters::http::{app_router, EntitlementAppState};
use listing_credits::adapters::postgres::{
    PostgresEntitlementReader, PostgresEntitlementRepository, PostgresIdentityDirectory,
    PostgresPackageCatalog,
};
use listing_credits::adapters::stripe::StripePaymentGateway;
use listing_credits::application::{
    ExpireEntitlementsCommand, ExpireEntitlementsHandler, OperationTimeouts,
};
use listing_credits::config::{AppConfig, ServerConfig};
use listing_credits::domain::foundation::Timestamp;
use listing_credits::ports::EntitlementRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        livemode = config.payment.require_livemode,
        "Starting listing credits service"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let repository: Arc<dyn EntitlementRepository> =
        Arc::new(PostgresEntitlementRepository::new(pool.clone()));
    let timeouts = config.fulfillment.timeouts();

    let state = EntitlementAppState {
        identity_directory: Arc::new(PostgresIdentityDirectory::new(pool.clone())),
        package_catalog: Arc::new(PostgresPackageCatalog::new(pool.clone())),
        payment_gateway: Arc::new(StripePaymentGateway::new(config.payment.stripe_config())),
        entitlement_repository: repository.clone(),
        entitlement_reader: Arc::new(PostgresEntitlementReader::new(pool.clone())),
        timeouts,
    };

    let sweep = config
        .fulfillment
        .sweep_interval()
        .map(|interval| spawn_expiry_sweep(repository, timeouts, interval));

    let app = app_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(cors_layer(&config.server)),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

/// Periodically moves lapsed active entitlements to `expired`.
fn spawn_expiry_sweep(
    repository: Arc<dyn EntitlementRepository>,
    timeouts: OperationTimeouts,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!(interval_secs = interval.as_secs(), "Expiry sweep enabled");
    let handler = ExpireEntitlementsHandler::new(repository, timeouts);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let cmd = ExpireEntitlementsCommand {
                as_of: Timestamp::now(),
            };
            if let Err(e) = handler.handle(cmd).await {
                tracing::warn!(error = %e, "Expiry sweep failed, retrying next tick");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server");
}
