//! Baseline asset filtering
//!
//! A baseline set describes content the target platform's shared runtime
//! already provides. Matching assets are dropped before materialization
//! and manifest accounting so the composed cache ships only what the
//! target machine is missing; `--skip-baseline-removal` keeps them for
//! self-contained or diagnostic compositions.

use crate::closure::{AssetEntry, PackageIdentity};
use crate::error::{PackstoreError, PackstoreResult};
use semver::Version;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Package identities and asset paths supplied by the shared runtime
#[derive(Debug, Clone, Default)]
pub struct BaselineAssetSet {
    /// Platform the set was authored for, if recorded in the file
    pub platform: Option<String>,

    packages: Vec<BaselinePackage>,
    paths: HashSet<String>,
}

/// A baseline package entry; no version means every version of the id
#[derive(Debug, Clone)]
struct BaselinePackage {
    store_id: String,
    version: Option<Version>,
}

// Wire format of a baseline file
#[derive(Debug, Deserialize)]
struct BaselineFile {
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    packages: Vec<BaselinePackageRecord>,
    #[serde(default)]
    paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BaselinePackageRecord {
    id: String,
    #[serde(default)]
    version: Option<String>,
}

impl BaselineAssetSet {
    /// An empty set: nothing is filtered
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a baseline set from a JSON file
    pub async fn load(path: &Path) -> PackstoreResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PackstoreError::BaselineRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        Self::parse(&content, path)
    }

    /// Parse baseline JSON (path used for diagnostics only)
    pub fn parse(content: &str, path: &Path) -> PackstoreResult<Self> {
        let file: BaselineFile =
            serde_json::from_str(content).map_err(|e| PackstoreError::BaselineInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::with_capacity(file.packages.len());
        for record in file.packages {
            let version = match record.version {
                Some(ref v) => {
                    Some(
                        Version::parse(v).map_err(|e| PackstoreError::BaselineInvalid {
                            path: path.to_path_buf(),
                            reason: format!("invalid version '{}' for {}: {}", v, record.id, e),
                        })?,
                    )
                }
                None => None,
            };
            packages.push(BaselinePackage {
                store_id: record.id.to_lowercase(),
                version,
            });
        }

        Ok(Self {
            platform: file.platform,
            packages,
            paths: file.paths.into_iter().collect(),
        })
    }

    /// Whether the whole package is baseline content
    pub fn matches_package(&self, identity: &PackageIdentity) -> bool {
        let store_id = identity.store_id();
        self.packages.iter().any(|p| {
            p.store_id == store_id
                && p.version
                    .as_ref()
                    .is_none_or(|v| *v == identity.version)
        })
    }

    /// Whether one asset of a package is baseline content
    pub fn matches_asset(&self, identity: &PackageIdentity, asset: &AssetEntry) -> bool {
        self.matches_package(identity) || self.paths.contains(&asset.path)
    }

    /// Drop baseline-matched assets from a selected list
    pub fn retain_assets(
        &self,
        identity: &PackageIdentity,
        assets: Vec<AssetEntry>,
    ) -> Vec<AssetEntry> {
        let before = assets.len();
        let retained: Vec<AssetEntry> = assets
            .into_iter()
            .filter(|a| !self.matches_asset(identity, a))
            .collect();
        if retained.len() != before {
            debug!(
                "Baseline filtered {}/{} assets of {}",
                before - retained.len(),
                before,
                identity
            );
        }
        retained
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.paths.is_empty()
    }
}
