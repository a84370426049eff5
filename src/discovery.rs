//! Channel discovery: join catalog channels and scan the directory for pattern matches
//!
//! Explicit joins always run before the directory scan. Every join failure is logged
//! against its channel and the remaining channels are still attempted.

use crate::catalog::PatternCatalog;
use crate::client::{JoinTarget, MessagingClient};
use crate::config::DiscoveryConfig;
use crate::error::JoinError;
use crate::types::ChannelCandidate;
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Counters for one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinReport {
    /// Directory entries read
    pub scanned: usize,
    /// Entries or identifiers that matched and were considered for joining
    pub matched: usize,
    /// Join requests sent to the client
    pub attempted: usize,
    /// Join requests the client accepted
    pub joined: usize,
    /// Join requests the client rejected
    pub failed: usize,
    /// Requests skipped because the same channel was already requested
    pub duplicates: usize,
}

impl JoinReport {
    fn merge(self, other: Self) -> Self {
        Self {
            scanned: self.scanned + other.scanned,
            matched: self.matched + other.matched,
            attempted: self.attempted + other.attempted,
            joined: self.joined + other.joined,
            failed: self.failed + other.failed,
            duplicates: self.duplicates + other.duplicates,
        }
    }
}

/// Channels already requested during one run (only consulted when deduplicating)
struct JoinLedger {
    seen: Option<HashSet<String>>,
}

impl JoinLedger {
    fn new(dedupe: bool) -> Self {
        Self {
            seen: dedupe.then(HashSet::new),
        }
    }

    /// Returns false if `key` was already recorded
    fn record(&mut self, key: String) -> bool {
        match &mut self.seen {
            Some(seen) => seen.insert(key),
            None => true,
        }
    }
}

/// Normalize a handle or link into a comparison key
///
/// `"@Foo"`, `"https://t.me/foo"` and `"foo"` all map to `"foo"`.
pub fn normalize_handle(identifier: &str) -> String {
    let mut key = identifier.trim();
    for prefix in [
        "https://t.me/",
        "http://t.me/",
        "https://telegram.me/",
        "http://telegram.me/",
        "t.me/",
        "telegram.me/",
    ] {
        if let Some(rest) = key.strip_prefix(prefix) {
            key = rest;
            break;
        }
    }
    key.trim_start_matches('@').trim_end_matches('/').to_lowercase()
}

fn candidate_key(candidate: &ChannelCandidate) -> String {
    if candidate.identifier.is_empty() {
        format!("#{}", candidate.channel_id)
    } else {
        normalize_handle(&candidate.identifier)
    }
}

/// Joins the catalog's explicit channels and any directory entries its patterns match
#[derive(Debug)]
pub struct ChannelDiscoveryEngine {
    catalog: PatternCatalog,
    dedupe_joins: bool,
}

impl ChannelDiscoveryEngine {
    /// Create an engine that owns `catalog`
    pub fn new(catalog: PatternCatalog, config: &DiscoveryConfig) -> Self {
        Self {
            catalog,
            dedupe_joins: config.dedupe_joins,
        }
    }

    /// The catalog this engine evaluates
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Join explicit channels, then scan the directory, sharing one ledger
    pub async fn run<C>(&self, client: &C) -> JoinReport
    where
        C: MessagingClient + ?Sized,
    {
        let mut ledger = JoinLedger::new(self.dedupe_joins);
        let explicit = self.join_explicit_with(client, &mut ledger).await;
        let discovered = self.search_and_join_with(client, &mut ledger).await;
        let report = explicit.merge(discovered);
        info!(
            scanned = report.scanned,
            attempted = report.attempted,
            joined = report.joined,
            failed = report.failed,
            "channel discovery finished"
        );
        report
    }

    /// Issue a join request for every explicit catalog entry
    pub async fn join_explicit<C>(&self, client: &C) -> JoinReport
    where
        C: MessagingClient + ?Sized,
    {
        self.join_explicit_with(client, &mut JoinLedger::new(self.dedupe_joins))
            .await
    }

    /// Scan the directory and join every broadcast channel a pattern matches
    ///
    /// Returns immediately, without reading the directory, when the catalog has no patterns.
    pub async fn search_and_join<C>(&self, client: &C) -> JoinReport
    where
        C: MessagingClient + ?Sized,
    {
        self.search_and_join_with(client, &mut JoinLedger::new(self.dedupe_joins))
            .await
    }

    async fn join_explicit_with<C>(&self, client: &C, ledger: &mut JoinLedger) -> JoinReport
    where
        C: MessagingClient + ?Sized,
    {
        let mut report = JoinReport::default();

        // Entries are forwarded as written, even empty ones; the client decides validity
        for identifier in self.catalog.explicit() {
            report.matched += 1;
            if !ledger.record(normalize_handle(identifier)) {
                debug!(channel = %identifier, "channel already requested, skipping");
                report.duplicates += 1;
                continue;
            }
            join_one(client, JoinTarget::Explicit(identifier), &mut report).await;
        }

        report
    }

    async fn search_and_join_with<C>(&self, client: &C, ledger: &mut JoinLedger) -> JoinReport
    where
        C: MessagingClient + ?Sized,
    {
        let mut report = JoinReport::default();

        if self.catalog.patterns().is_empty() {
            debug!("no channel patterns configured, skipping directory scan");
            return report;
        }

        let mut directory = client.directory();
        while let Some(entry) = directory.next().await {
            let candidate = match entry {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            report.scanned += 1;

            if !candidate.is_broadcast {
                continue;
            }

            let text = candidate.match_text();
            if !self.catalog.matches_any(&text) {
                continue;
            }

            debug!(channel = %text, "directory entry matched catalog pattern");
            report.matched += 1;
            if !ledger.record(candidate_key(&candidate)) {
                debug!(channel = %text, "channel already requested, skipping");
                report.duplicates += 1;
                continue;
            }
            join_one(client, JoinTarget::Discovered(&candidate), &mut report).await;
        }

        report
    }
}

async fn join_one<C>(client: &C, target: JoinTarget<'_>, report: &mut JoinReport)
where
    C: MessagingClient + ?Sized,
{
    report.attempted += 1;
    match client.join_channel(target).await {
        Ok(()) => {
            report.joined += 1;
            info!(channel = %target, "joined channel");
        }
        Err(e @ JoinError::AlreadyParticipant { .. }) => {
            report.failed += 1;
            info!(channel = %target, reason = %e, "channel not joined");
        }
        Err(e) => {
            report.failed += 1;
            error!(channel = %target, error = %e, "unable to join channel");
        }
    }
}
