//! Resolved dependency closures
//!
//! A closure file is the handoff artifact from the external package
//! resolver: the full resolved package set for one project/platform
//! combination, with every package's on-disk root and asset list.

pub mod merge;

pub use merge::{merge_closures, MergedPackage};

use crate::error::{PackstoreError, PackstoreResult};
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What a packaged file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Managed runtime library, eligible for ahead-of-time optimization
    Managed,
    /// Native runtime artifact (launcher, shared library, static archive)
    Native,
    /// Compile-time-only reference, never materialized into a cache
    Compile,
}

/// One file inside a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Package-relative path, forward slashes
    pub path: String,

    /// Asset kind
    pub kind: AssetKind,

    /// Platform the asset is qualified for; `None` means neutral
    pub platform: Option<String>,
}

/// Package id + exact version. The primary key throughout.
///
/// Ids compare case-insensitively; versions compare exactly, prerelease
/// label included. The original casing of the id is preserved for the
/// manifest.
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    pub id: String,
    pub version: Version,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Parse the version string, preserving the prerelease suffix
    pub fn parse(id: &str, version: &str) -> PackstoreResult<Self> {
        let version = Version::parse(version).map_err(|e| PackstoreError::VersionInvalid {
            id: id.to_string(),
            version: version.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(id, version))
    }

    /// Lowercased id, used for output directory names and comparisons
    pub fn store_id(&self) -> String {
        self.id.to_lowercase()
    }

    /// Output-relative directory for this package: `<lowercased id>/<version>`
    pub fn store_dir(&self) -> PathBuf {
        PathBuf::from(self.store_id()).join(self.version.to_string())
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl std::hash::Hash for PackageIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.store_id().hash(state);
        self.version.hash(state);
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.store_id()
            .cmp(&other.store_id())
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A resolved package: identity, extracted location on disk, asset list
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub identity: PackageIdentity,

    /// Directory the resolver extracted the package into
    pub root: PathBuf,

    /// Ordered asset list, paths relative to `root`
    pub assets: Vec<AssetEntry>,
}

/// One resolved dependency closure, loaded from a closure file
#[derive(Debug, Clone)]
pub struct DependencyClosure {
    /// Platform the resolver targeted, if recorded in the file
    pub platform: Option<String>,

    /// File the closure was loaded from
    pub source: PathBuf,

    pub packages: Vec<ResolvedPackage>,
}

// Wire format of a closure file
#[derive(Debug, Deserialize)]
struct ClosureFile {
    #[serde(default)]
    platform: Option<String>,
    packages: Vec<PackageRecord>,
}

#[derive(Debug, Deserialize)]
struct PackageRecord {
    id: String,
    version: String,
    root: PathBuf,
    #[serde(default)]
    assets: Vec<AssetRecord>,
}

#[derive(Debug, Deserialize)]
struct AssetRecord {
    path: String,
    kind: AssetKind,
    #[serde(default)]
    platform: Option<String>,
}

impl DependencyClosure {
    /// Load a closure from a JSON file produced by the resolver
    pub async fn load(path: &Path) -> PackstoreResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PackstoreError::ClosureRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        Self::parse(&content, path)
    }

    /// Parse closure JSON (path used for diagnostics only)
    pub fn parse(content: &str, path: &Path) -> PackstoreResult<Self> {
        let file: ClosureFile =
            serde_json::from_str(content).map_err(|e| PackstoreError::ClosureInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::with_capacity(file.packages.len());
        for record in file.packages {
            validate_package_id(&record.id, path)?;
            let identity = PackageIdentity::parse(&record.id, &record.version)?;

            let mut assets = Vec::with_capacity(record.assets.len());
            for asset in record.assets {
                validate_asset_path(&asset.path, &record.id, path)?;
                assets.push(AssetEntry {
                    path: asset.path,
                    kind: asset.kind,
                    platform: asset.platform,
                });
            }

            packages.push(ResolvedPackage {
                identity,
                root: record.root,
                assets,
            });
        }

        Ok(Self {
            platform: file.platform,
            source: path.to_path_buf(),
            packages,
        })
    }
}

/// Package ids become directory names, so they must be plain names
fn validate_package_id(id: &str, path: &Path) -> PackstoreResult<()> {
    if id.is_empty() {
        return Err(PackstoreError::ClosureInvalid {
            path: path.to_path_buf(),
            reason: "package id cannot be empty".to_string(),
        });
    }
    if id.contains('/') || id.contains('\\') || id.contains("..") || id.contains('\0') {
        return Err(PackstoreError::ClosureInvalid {
            path: path.to_path_buf(),
            reason: format!("invalid package id '{id}': must not contain path separators or '..'"),
        });
    }
    Ok(())
}

/// Asset paths stay inside the package root
fn validate_asset_path(asset_path: &str, id: &str, path: &Path) -> PackstoreResult<()> {
    let invalid = asset_path.is_empty()
        || asset_path.starts_with('/')
        || asset_path.contains('\\')
        || asset_path.contains('\0')
        || asset_path.split('/').any(|seg| seg == ".." || seg.is_empty());
    if invalid {
        return Err(PackstoreError::ClosureInvalid {
            path: path.to_path_buf(),
            reason: format!("invalid asset path '{asset_path}' in package {id}"),
        });
    }
    Ok(())
}
