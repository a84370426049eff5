//! # channel-harvester
//!
//! Pattern-driven channel discovery and password-aware archive ingestion for
//! messaging platforms.
//!
//! ## What it does
//!
//! - Loads a declarative catalog of explicit channels and regex patterns
//! - Joins the explicit channels, then scans the channel directory and joins every
//!   broadcast channel a pattern matches
//! - Subscribes to new messages, downloads archive attachments (.zip, .rar, .7z),
//!   finds the password in the message text and extracts the archive with it
//!
//! Every failure (a bad pattern, a rejected join, a broken download, a wrong
//! password) is logged and affects only that one unit of work.
//!
//! The messaging transport is supplied by the embedder through the
//! [`MessagingClient`] and [`MediaDownloader`] traits.
//!
//! ## Quick Start
//!
//! ```no_run
//! use channel_harvester::{ChannelHarvester, HarvesterConfig, run_until_shutdown, telemetry};
//! use channel_harvester::client::{MediaDownloader, MessagingClient};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     client: Arc<dyn MessagingClient>,
//! #     media: Arc<dyn MediaDownloader>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvesterConfig::from_file("harvester.yaml".as_ref()).await?;
//! let _telemetry = telemetry::init(&config.logging)?;
//!
//! let mut harvester = ChannelHarvester::new(config, client, media)?;
//! let report = harvester.start().await?;
//! println!("joined {} channels", report.joined);
//!
//! run_until_shutdown(harvester).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Declarative channel catalog
pub mod catalog;
/// Messaging transport collaborator traits
pub mod client;
/// Configuration types
pub mod config;
/// Channel discovery and joining
pub mod discovery;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Startup sequencing of discovery and ingestion
pub mod harvester;
/// Message subscription and attachment processing
pub mod ingestion;
/// Password detection in message text
pub mod password;
/// Tracing subscriber setup
pub mod telemetry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use catalog::PatternCatalog;
pub use client::{JoinTarget, MediaDownloader, MessagingClient};
pub use config::HarvesterConfig;
pub use discovery::{ChannelDiscoveryEngine, JoinReport};
pub use error::{
    ConfigLoadError, DirectoryError, DownloadError, Error, ExtractionError, JoinError,
    PatternCompileError, Result,
};
pub use extraction::{ArchiveCodecRouter, ArchiveExtractor, ExtractionOutcome};
pub use harvester::ChannelHarvester;
pub use ingestion::{IngestionOrchestrator, MessageOutcome, OrchestratorState};
pub use password::PasswordExtractor;
pub use types::{
    ArchiveKind, Attachment, ChannelCandidate, ChatId, DownloadedMedia, ExtractionRequest,
    IncomingAttachment, IncomingMessage,
};

/// Run the harvester until a termination signal arrives, then stop it.
///
/// Listens for Ctrl+C everywhere and additionally for SIGTERM on Unix.
///
/// In-flight messages are allowed to finish before this returns.
pub async fn run_until_shutdown(mut harvester: ChannelHarvester) {
    wait_for_signal().await;
    harvester.stop().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // SIGTERM registration can fail in restricted environments; fall back to SIGINT only
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        interrupt = tokio::signal::ctrl_c() => log_interrupt(interrupt),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    log_interrupt(tokio::signal::ctrl_c().await);
}

fn log_interrupt(result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C, shutting down"),
    }
}
