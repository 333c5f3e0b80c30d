use std::sync::Arc;

use anyhow::Context;

use character_forge::config::{AppConfig, ConfigSource};
use character_forge::core::api::{ApiService, AppState};
use character_forge::core::collection::{CollectionStore, PinataClient, RelayContract};
use character_forge::core::image_gen::{GenerationOrchestrator, ImageDefaults, StabilityProvider};
use character_forge::core::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = AppConfig::load();

    if std::env::args().skip(1).any(|arg| arg == "--print-config") {
        if let ConfigSource::Defaults { path, error } = &source {
            eprintln!("warning: {} ({}); using defaults", error, path.display());
        }
        let rendered = toml::to_string_pretty(&config.redacted())
            .context("Failed to render configuration")?;
        println!("{}", rendered);
        return Ok(());
    }

    let _log_guard = logging::init(&config.log_dir());
    log::info!("{} v{} starting", character_forge::NAME, character_forge::VERSION);
    source.report();

    if config.image.api_key.is_empty() {
        log::warn!("STABILITY_API_KEY is not set; generation requests will fail");
    }

    let orchestrator = GenerationOrchestrator::new(
        Arc::new(StabilityProvider::new(config.image.clone())),
        ImageDefaults::from(&config.image),
    );
    let state = Arc::new(AppState::new(
        orchestrator,
        Arc::new(PinataClient::new(config.pinning.clone())),
        Arc::new(RelayContract::new(config.contract.clone())),
        config.contract.marketplace_url.clone(),
        CollectionStore::new(config.data_dir()),
    ));

    let addr = config.server.socket_addr()?;
    let mut service = ApiService::new(addr, state);
    service
        .start()
        .await
        .with_context(|| format!("Failed to bind API service to {}", addr))?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    service.stop().await;

    Ok(())
}
