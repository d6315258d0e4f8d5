//! Main application orchestration.
//!
//! Coordinates all components:
//! - Account resolution over REST
//! - The depth-feed session and its update handlers
//! - The stop trigger consuming book-order events

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::trigger::{StopTrigger, TriggerOutcome};
use tickstop_core::BookOrder;
use tickstop_rest::{OrderPlacer, RequestSigner, RestClient, VenueOrderPlacer};
use tickstop_telemetry::Metrics;
use tickstop_ws::ConnectionManager;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve the trading account, then watch the feed until the order is
    /// placed.
    pub async fn run(&self) -> AppResult<TriggerOutcome> {
        let credentials = &self.config.credentials;
        let signer = RequestSigner::new(&credentials.api_key, &credentials.api_secret);
        let client = RestClient::new(&self.config.settings.rest_url, signer)?;

        info!(rest_url = %self.config.settings.rest_url, "Resolving trading account");
        let account_id = client.single_account_id().await?;

        let placer = VenueOrderPlacer::new(client, account_id);
        self.run_with_placer(&placer).await
    }

    /// Stream depth for the configured instrument and fire through `placer`.
    pub async fn run_with_placer(&self, placer: &dyn OrderPlacer) -> AppResult<TriggerOutcome> {
        let settings = &self.config.settings;
        let (events_tx, mut events_rx) = mpsc::channel::<BookOrder>(settings.event_queue);

        let (session, task) = ConnectionManager::spawn(self.config.connection_config(), events_tx);
        let instrument = self.config.trigger.instrument.clone();
        session.subscribe(instrument.clone()).await?;
        info!(instrument = %instrument, url = %settings.ws.url, "Depth feed requested");

        let trigger = StopTrigger::new(self.config.trigger.clone(), settings.book_capacity);
        let result = tokio::select! {
            result = trigger.run(&mut events_rx, placer) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                Err(AppError::Shutdown)
            }
        };

        session.shutdown();
        drop(events_rx);
        if let Err(e) = task.await {
            warn!(error = %e, "Session task did not finish cleanly");
        }

        match Metrics::render() {
            Ok(rendered) => debug!(metrics = %rendered, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }

        result
    }
}
