//! Declarative catalog of channels to join
//!
//! The catalog source is a YAML document with two optional sequences:
//!
//! ```yaml
//! channels:
//!   - "@osint_feed"
//!   - "https://t.me/leaks_mirror"
//! regex:
//!   - "scam"
//!   - "leak(s|ed)?"
//! ```
//!
//! Loading never fails. A missing or unreadable document produces an empty catalog,
//! and a pattern that does not compile is skipped on its own.

use crate::error::{ConfigLoadError, PatternCompileError};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Compiled DFA size limit per pattern
const PATTERN_SIZE_LIMIT: usize = 1024 * 1024;

/// Raw document shape; entries stay untyped so one bad entry can be skipped
#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    channels: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    regex: Option<Vec<serde_yaml::Value>>,
}

/// Explicit channel identifiers plus compiled, case-insensitive match patterns
///
/// Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    explicit: Vec<String>,
    patterns: Vec<Regex>,
}

impl PatternCatalog {
    /// Load the catalog from a YAML file
    ///
    /// Never fails: load problems are logged and yield an empty catalog.
    pub async fn load(source: &Path) -> Self {
        match Self::try_load(source).await {
            Ok(catalog) => catalog,
            Err(ConfigLoadError::NotFound { path }) => {
                warn!(?path, "channel catalog not found, continuing with an empty catalog");
                Self::default()
            }
            Err(e) => {
                error!(error = %e, "failed to load channel catalog, continuing with an empty catalog");
                Self::default()
            }
        }
    }

    /// Load the catalog, reporting why the document could not be used
    ///
    /// Invalid patterns are still skipped rather than reported.
    pub async fn try_load(source: &Path) -> Result<Self, ConfigLoadError> {
        let content = match tokio::fs::read_to_string(source).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigLoadError::NotFound {
                    path: source.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(ConfigLoadError::Read {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
        };

        let catalog = Self::parse(&content).map_err(|reason| ConfigLoadError::Parse {
            path: source.to_path_buf(),
            reason,
        })?;

        info!(
            ?source,
            explicit = catalog.explicit.len(),
            patterns = catalog.patterns.len(),
            "loaded channel catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from YAML text, falling back to empty on a parse error
    pub fn from_yaml_str(content: &str) -> Self {
        Self::parse(content).unwrap_or_else(|reason| {
            error!(%reason, "failed to parse channel catalog, continuing with an empty catalog");
            Self::default()
        })
    }

    /// Build a catalog from already-split lists
    pub fn from_parts<S: AsRef<str>>(channels: &[S], regex: &[S]) -> Self {
        Self {
            explicit: channels
                .iter()
                .map(|c| c.as_ref().trim().to_string())
                .collect(),
            patterns: compile_patterns(regex.iter().map(|p| p.as_ref().to_string())),
        }
    }

    fn parse(content: &str) -> Result<Self, String> {
        // An empty or `null` document is an empty catalog
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: Option<CatalogDocument> =
            serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        let document = document.unwrap_or_default();

        let explicit = document
            .channels
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| match entry {
                serde_yaml::Value::String(handle) => Some(handle.trim().to_string()),
                other => {
                    warn!(entry = ?other, "skipping non-string channel entry");
                    None
                }
            })
            .collect();

        let patterns = compile_patterns(
            document
                .regex
                .unwrap_or_default()
                .iter()
                .filter_map(pattern_source),
        );

        Ok(Self { explicit, patterns })
    }

    /// Explicit channel identifiers, trimmed, in document order
    pub fn explicit(&self) -> &[String] {
        &self.explicit
    }

    /// Compiled patterns in document order
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Pattern sources of the compiled patterns, in document order
    pub fn pattern_sources(&self) -> Vec<&str> {
        self.patterns.iter().map(Regex::as_str).collect()
    }

    /// Whether any pattern matches `text` (stops at the first match)
    pub fn matches_any(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// Whether the catalog has neither explicit channels nor patterns
    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.patterns.is_empty()
    }
}

/// Stringify a scalar `regex` entry; sequences and maps are skipped
fn pattern_source(entry: &serde_yaml::Value) -> Option<String> {
    match entry {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        other => {
            warn!(entry = ?other, "skipping non-scalar regex entry");
            None
        }
    }
}

/// Compile a single pattern case-insensitively
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternCompileError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|source| PatternCompileError {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compile patterns in order; invalid ones are logged and skipped
fn compile_patterns(patterns: impl Iterator<Item = String>) -> Vec<Regex> {
    patterns
        .filter_map(|pattern| match compile_pattern(&pattern) {
            Ok(re) => {
                debug!(pattern = re.as_str(), "compiled channel pattern");
                Some(re)
            }
            Err(e) => {
                error!(error = %e, "skipping invalid channel pattern");
                None
            }
        })
        .collect()
}
