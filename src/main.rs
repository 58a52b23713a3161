use minidek::{
    certify::HttpScoreCertifier,
    config::GameConfig,
    generator::{CreatureGenerator, HttpCreatureGenerator, LocalCreatureGenerator},
    handlers,
    shared::AppState,
    store::{GameStore, InMemoryGameStore, PostgresGameStore},
    GameSessionController,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minidek=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting minidek server");
    let config = GameConfig::from_env();

    let store: Arc<dyn GameStore> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let store = PostgresGameStore::new(pool, config.starting_tokens);
            let version = store.migrate().await?;
            info!(schema_version = version, "Using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, progress will not survive a restart");
            Arc::new(InMemoryGameStore::new(config.starting_tokens))
        }
    };

    let generator: Arc<dyn CreatureGenerator> = match &config.api_base_url {
        Some(base_url) => {
            info!(base_url = %base_url, "Using remote creature generator");
            Arc::new(HttpCreatureGenerator::new(
                base_url.as_str(),
                config.bearer_token.as_str(),
                config.generator_timeout,
            ))
        }
        None => {
            info!("Using local creature generator");
            Arc::new(LocalCreatureGenerator::new())
        }
    };

    let mut controller = GameSessionController::new(store, generator, config.clone());
    if let Some(certify_url) = &config.certify_url {
        info!(certify_url = %certify_url, "Score certification enabled");
        controller = controller.with_certifier(Arc::new(HttpScoreCertifier::new(
            certify_url.as_str(),
            config.bearer_token.as_str(),
            config.generator_timeout,
        )));
    }

    let controller = Arc::new(controller);
    let launch = controller.initialize().await;
    info!(can_continue = launch.can_continue, "Session state loaded");

    let app = handlers::router(AppState::new(controller));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
