//!
//! Reservation core service entrypoint.
//! Reads configuration from TOML file
//! (~/.config/dinesync-reservations/config.toml).

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use dinesync_reservations::application::correlation::CorrelationBrokers;
use dinesync_reservations::application::services::{
    start_reconciler_tasks, ExpirationReconciler, MenuProjection, ReservationService,
    RestaurantValidator, TableAssigner,
};
use dinesync_reservations::cache::TableStatusCache;
use dinesync_reservations::config::{default_config_path, AppConfig};
use dinesync_reservations::domain::RepositoryProvider;
use dinesync_reservations::infrastructure::database::migrator::Migrator;
use dinesync_reservations::infrastructure::database::repositories::SeaOrmRepositoryProvider;
use dinesync_reservations::infrastructure::init_database;
use dinesync_reservations::infrastructure::rest::RestTablesClient;
use dinesync_reservations::messaging::consumers::{spawn_consumers, InboundRouter};
use dinesync_reservations::messaging::kafka::{
    create_producer, KafkaEventPublisher,
};
use dinesync_reservations::messaging::SharedEventPublisher;
use dinesync_reservations::shared::clock::SystemClock;
use dinesync_reservations::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("RESERVATION_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                        tracing_subscriber::EnvFilter::new(&config.logging.level)
                    }),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            config
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting DineSync reservation core...");

    // ── Prometheus metrics recorder ────────────────────────────
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("Prometheus metrics recorder installed");

    // ── Database ───────────────────────────────────────────────
    let db = match init_database(&config.database.url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));

    // ── Bus, caches, broker ────────────────────────────────────
    let kafka_settings = config.kafka_settings();
    let producer = create_producer(&kafka_settings)?;
    let publisher: SharedEventPublisher = Arc::new(KafkaEventPublisher::new(
        producer,
        kafka_settings.publish_timeout,
    ));
    let brokers = CorrelationBrokers::shared();
    let table_statuses = TableStatusCache::shared();
    let clock = Arc::new(SystemClock);

    // ── Services ───────────────────────────────────────────────
    let validator = Arc::new(RestaurantValidator::new(
        brokers.clone(),
        publisher.clone(),
        config.restaurant_validation_timeout(),
    ));
    let tables_api = Arc::new(RestTablesClient::new(config.restaurant_service.url.clone()));
    let assigner = Arc::new(TableAssigner::new(
        brokers.clone(),
        publisher.clone(),
        repos.clone(),
        table_statuses.clone(),
        tables_api,
        config.table_availability_timeout(),
    ));
    // the delivery layer (HTTP gateway) drives the coordinator from
    // its own process; constructing it here keeps the wiring honest
    // for embedders of this crate
    let _service = Arc::new(ReservationService::new(
        repos.clone(),
        validator,
        assigner.clone(),
        publisher.clone(),
        clock.clone(),
        config.reservation_rules(),
    ));

    // ── Background tasks + consumers ───────────────────────────
    let shutdown = ShutdownSignal::new();

    let reconciler = Arc::new(ExpirationReconciler::new(
        repos.clone(),
        assigner,
        publisher,
        clock,
        config.completion_policy(),
    ));
    start_reconciler_tasks(
        reconciler,
        brokers.clone(),
        config.reconciler_schedule(),
        shutdown.clone(),
    );

    let router = Arc::new(InboundRouter {
        brokers,
        table_statuses,
        menu_projection: Arc::new(MenuProjection::new(repos)),
    });
    spawn_consumers(&kafka_settings, router, shutdown.clone())?;

    info!("Reservation core running; waiting for shutdown signal");
    listen_for_shutdown_signals(shutdown).await;
    info!("Shutdown complete");
    Ok(())
}
