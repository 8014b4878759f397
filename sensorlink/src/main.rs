use sensorlink::rest::{serve, MemorySink, RequestState};
use sensorlink::settings::AppConfig;
use sensorlink::{info, logger, AppError};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logger::init_from_env();
    let path = std::env::args().nth(1).unwrap_or_else(|| "config/settings".to_string());
    let config = AppConfig::new(&path)?;
    if !config.http.enable {
        info!("HTTP is disabled, nothing to serve");
        return Ok(());
    }
    if config.experimental.custom_links_enable {
        info!("Custom links enabled, recurse depth {}", config.experimental.custom_links_recurse_depth);
    }

    let state = RequestState::from_config(&config, Arc::new(MemorySink::default()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });
    serve(state, config.http.bind_address, shutdown_rx).await
}
