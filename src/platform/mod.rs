//! Platform fallback graph
//!
//! Platform identifiers form fallback chains (self → parent platforms →
//! neutral). Chains are precomputed configuration data, not derived at
//! runtime: some combinations need historical pins that no general rule
//! produces. A default graph is compiled into the binary; `--platform-graph`
//! replaces it wholesale.

pub mod select;

pub use select::select_assets;

use crate::error::{PackstoreError, PackstoreResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// Default graph embedded at compile time
const BUILTIN_GRAPH: &str = include_str!("../../data/platforms.toml");

/// Fallback chains plus per-package-family platform pins
#[derive(Debug, Clone)]
pub struct PlatformGraph {
    chains: BTreeMap<String, Vec<String>>,
    overrides: Vec<PlatformOverride>,
}

/// Pin: packages whose lowercased id starts with `package_prefix` always
/// resolve against `platform`'s chain, whatever the request asked for
#[derive(Debug, Clone)]
pub struct PlatformOverride {
    pub package_prefix: String,
    pub platform: String,
}

// Wire format of a platform graph file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GraphFile {
    #[serde(default)]
    platform: BTreeMap<String, PlatformRecord>,

    #[serde(default, rename = "override")]
    overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Deserialize)]
struct PlatformRecord {
    #[serde(default)]
    fallback: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct OverrideRecord {
    package_prefix: String,
    platform: String,
}

impl PlatformGraph {
    /// The graph compiled into the binary
    pub fn builtin() -> PackstoreResult<Self> {
        Self::parse(BUILTIN_GRAPH, None)
    }

    /// Load a replacement graph from a TOML file
    pub async fn load(path: &Path) -> PackstoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PackstoreError::io(format!("reading platform graph {}", path.display()), e)
        })?;
        Self::parse(&content, Some(path))
    }

    /// Parse a graph from TOML (path used for diagnostics only)
    pub fn parse(content: &str, path: Option<&Path>) -> PackstoreResult<Self> {
        let file: GraphFile =
            toml::from_str(content).map_err(|e| PackstoreError::PlatformGraphInvalid {
                path: path.map(Path::to_path_buf),
                reason: e.to_string(),
            })?;

        let mut chains = BTreeMap::new();
        for (platform, record) in file.platform {
            if record.fallback.iter().any(|p| p == &platform) {
                return Err(PackstoreError::PlatformGraphInvalid {
                    path: path.map(Path::to_path_buf),
                    reason: format!("platform {platform} lists itself as a fallback"),
                });
            }
            chains.insert(platform, record.fallback);
        }

        let overrides = file
            .overrides
            .into_iter()
            .map(|o| PlatformOverride {
                package_prefix: o.package_prefix.to_lowercase(),
                platform: o.platform,
            })
            .collect();

        Ok(Self { chains, overrides })
    }

    /// Fallback chain for a platform: the platform itself, then its
    /// configured parents, in order. The neutral terminal is implicit.
    /// Unknown platforms get a chain of just themselves.
    pub fn chain(&self, platform: &str) -> Vec<String> {
        let mut chain = vec![platform.to_string()];
        if let Some(fallback) = self.chains.get(platform) {
            for parent in fallback {
                if !chain.contains(parent) {
                    chain.push(parent.clone());
                }
            }
        }
        chain
    }

    /// Chain to use for one package: the requested platform's, unless an
    /// override pins the package family to a different platform
    pub fn chain_for_package(&self, package_id: &str, platform: &str) -> Vec<String> {
        let store_id = package_id.to_lowercase();
        for pin in &self.overrides {
            if store_id.starts_with(&pin.package_prefix) {
                debug!(
                    "Package {} pinned to platform {} (prefix '{}')",
                    package_id, pin.platform, pin.package_prefix
                );
                return self.chain(&pin.platform);
            }
        }
        self.chain(platform)
    }

    /// All platforms with configured chains, for diagnostics
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn overrides(&self) -> &[PlatformOverride] {
        &self.overrides
    }

    /// Resolve the graph to use: an explicit file, then a user-level
    /// graph at the config dir, then the built-in.
    pub async fn resolve(explicit: Option<&Path>) -> PackstoreResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        if let Some(user_path) = Self::user_graph_path() {
            if user_path.exists() {
                debug!("Using user platform graph {}", user_path.display());
                return Self::load(&user_path).await;
            }
        }
        Self::builtin()
    }

    /// Default on-disk location for a user-supplied graph, if any
    pub fn user_graph_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("packstore").join("platforms.toml"))
    }
}
