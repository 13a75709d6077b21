use std::sync::Arc;

use anyhow::Result;
use octopus_client::OctopusClient;
use octopus_exporter::{
    config::Settings,
    metrics_server::{self, AppState},
    observability, ConsumptionCollector,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Validate before logging is configured so `--debug` can take effect,
    // and before anything binds.
    let settings = Settings::load();
    observability::init_tracing(settings.as_ref().map(|s| s.debug).unwrap_or(false));
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!("octopus-exporter starting");
    tracing::info!(settings = ?settings, "effective settings");

    let prometheus = metrics_server::install_recorder()?;

    let client = OctopusClient::new(&settings.api_url, &settings.api_key, settings.request_timeout)?;
    let collector = ConsumptionCollector::new(Arc::new(client), settings.meters.clone());
    let state = AppState::new(collector, prometheus);

    metrics_server::serve(settings.listen_address, state, shutdown_signal()).await?;

    tracing::info!("octopus-exporter stopping");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
