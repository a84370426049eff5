//! Top-level wiring of discovery and ingestion
//!
//! [`ChannelHarvester::start`] performs the startup sequence in a fixed order:
//! 1. load the pattern catalog from `catalog_path`
//! 2. join the explicit channels
//! 3. scan the directory and join pattern matches
//! 4. subscribe to new messages
//!
//! Joins are best-effort; the subscription starts even if every join failed.

use crate::catalog::PatternCatalog;
use crate::client::{MediaDownloader, MessagingClient};
use crate::config::HarvesterConfig;
use crate::discovery::{ChannelDiscoveryEngine, JoinReport};
use crate::error::Result;
use crate::extraction::{ArchiveCodecRouter, ArchiveExtractor};
use crate::ingestion::{IngestionOrchestrator, OrchestratorState};
use std::sync::Arc;
use tracing::info;

/// Discovery plus ingestion over one messaging session
pub struct ChannelHarvester {
    config: HarvesterConfig,
    client: Arc<dyn MessagingClient>,
    orchestrator: IngestionOrchestrator,
}

impl ChannelHarvester {
    /// Create a harvester using the built-in archive codecs
    pub fn new(
        config: HarvesterConfig,
        client: Arc<dyn MessagingClient>,
        media: Arc<dyn MediaDownloader>,
    ) -> Result<Self> {
        let extractor = Arc::new(ArchiveCodecRouter::new(&config.extraction));
        Self::with_extractor(config, client, media, extractor)
    }

    /// Create a harvester with a caller-supplied extractor
    pub fn with_extractor(
        config: HarvesterConfig,
        client: Arc<dyn MessagingClient>,
        media: Arc<dyn MediaDownloader>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        let orchestrator = IngestionOrchestrator::new(
            Arc::clone(&client),
            media,
            extractor,
            config.download_dir.clone(),
            &config.ingestion,
        );
        Ok(Self {
            config,
            client,
            orchestrator,
        })
    }

    /// Run discovery, then subscribe to new messages
    ///
    /// Returns the discovery counters once the subscription is registered.
    pub async fn start(&mut self) -> Result<JoinReport> {
        let catalog = PatternCatalog::load(&self.config.catalog_path).await;
        let engine = ChannelDiscoveryEngine::new(catalog, &self.config.discovery);

        let report = engine.run(self.client.as_ref()).await;
        self.orchestrator.start().await?;

        info!(
            joined = report.joined,
            failed = report.failed,
            "harvester started"
        );
        Ok(report)
    }

    /// Stop the message subscription, waiting for in-flight messages
    pub async fn stop(&mut self) {
        self.orchestrator.stop().await;
    }

    /// Current ingestion state
    pub fn state(&self) -> OrchestratorState {
        self.orchestrator.state()
    }

    /// Configuration this harvester was built with
    pub fn config(&self) -> &HarvesterConfig {
        &self.config
    }
}
