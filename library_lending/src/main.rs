use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use library_lending::app_config::config_app;
use library_lending::catalogue_store::{
    CatalogueStore, InMemoryCatalogueStore, PostgresCatalogueStore,
};
use library_lending::clock::SystemClock;
use library_lending::fines_repository::{
    FinesRepository, InMemoryFinesRepository, PostgresFinesRepository,
};
use library_lending::lending_services::LendingServices;
use library_lending::reservations_repository::{
    InMemoryReservationsRepository, PostgresReservationsRepository, ReservationsRepository,
};
use library_lending::settings::Settings;

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() -> anyhow::Result<()> {
    let app_name = "library_lending";

    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .context("Failed to install OpenTelemetry tracer.")?;

    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install `tracing` subscriber.")
}

async fn init_services(settings: &Settings) -> anyhow::Result<LendingServices> {
    let clock = Arc::new(SystemClock);

    if settings.use_in_memory_db {
        tracing::info!("Using in-memory stores");
        return Ok(LendingServices::new(
            Arc::new(InMemoryCatalogueStore::default()),
            Arc::new(InMemoryFinesRepository::default()),
            Arc::new(InMemoryReservationsRepository::default()),
            clock,
        ));
    }

    let postgres_config = settings.postgres_config();
    let catalogue: Arc<dyn CatalogueStore> = Arc::new(
        PostgresCatalogueStore::init(&postgres_config)
            .await
            .context("Failed to init catalogue store")?,
    );
    let fines: Arc<dyn FinesRepository> = Arc::new(
        PostgresFinesRepository::init(&postgres_config)
            .await
            .context("Failed to init fines repository")?,
    );
    let reservations: Arc<dyn ReservationsRepository> = Arc::new(
        PostgresReservationsRepository::init(&postgres_config)
            .await
            .context("Failed to init reservations repository")?,
    );

    Ok(LendingServices::new(catalogue, fines, reservations, clock))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;
    let settings = Settings::from_env().context("Failed to read settings")?;
    tracing::info!("starting HTTP server at http://localhost:{}", settings.port);

    let services = init_services(&settings).await?;

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(services.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await?;

    Ok(())
}
