use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_api::{app, AppState};
use voyage_booking::{BookingEngine, EngineConfig};
use voyage_core::repository::{BookingRepository, PackageRepository, TripRepository};
use voyage_store::app_config::Config;
use voyage_store::{DbClient, EventProducer, InMemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Voyage API on port {}", config.server.port);

    let engine_config = EngineConfig {
        suggestion_limit: config.booking.suggestion_limit,
        horizon_days: config.booking.horizon_days,
    };

    let mut engine = match &config.database {
        Some(database) => {
            let db = DbClient::new(database)
                .await
                .context("Failed to connect to Postgres")?;
            if database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            let store = Arc::new(PostgresStore::new(db.pool.clone()));
            build_engine(store, engine_config)
        }
        None => {
            let store = match &config.booking.seed_path {
                Some(path) => InMemoryStore::load_seed_file(path)
                    .await
                    .context("Failed to load store seed")?,
                None => InMemoryStore::new(),
            };
            tracing::warn!("No database configured, using the in-memory store");
            build_engine(Arc::new(store), engine_config)
        }
    };

    if let Some(kafka) = &config.kafka {
        let producer = EventProducer::new(kafka).context("Failed to create Kafka producer")?;
        engine = engine.with_events(Arc::new(producer));
    }

    let app = app(AppState::new(Arc::new(engine)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_engine<S>(store: Arc<S>, config: EngineConfig) -> BookingEngine
where
    S: PackageRepository + TripRepository + BookingRepository + 'static,
{
    BookingEngine::new(store.clone(), store.clone(), store, config)
}
