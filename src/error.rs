//! Error types for packstore
//!
//! All modules use `PackstoreResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for packstore operations
pub type PackstoreResult<T> = Result<T, PackstoreError>;

/// Pipeline stage that produced a failure, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Merge,
    Select,
    Filter,
    Optimize,
    Materialize,
    WriteManifest,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Merge => "merge",
            Self::Select => "select",
            Self::Filter => "filter",
            Self::Optimize => "optimize",
            Self::Materialize => "materialize",
            Self::WriteManifest => "write-manifest",
        };
        f.write_str(name)
    }
}

/// All errors that can occur in packstore
#[derive(Error, Debug)]
pub enum PackstoreError {
    // Input errors
    #[error("Failed to read closure file {path}: {source}")]
    ClosureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid closure file {path}: {reason}")]
    ClosureInvalid { path: PathBuf, reason: String },

    #[error("Failed to read baseline file {path}: {source}")]
    BaselineRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid baseline file {path}: {reason}")]
    BaselineInvalid { path: PathBuf, reason: String },

    #[error("Invalid platform graph{}: {reason}", path_suffix(.path))]
    PlatformGraphInvalid {
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("Invalid version '{version}' for package {id}: {reason}")]
    VersionInvalid {
        id: String,
        version: String,
        reason: String,
    },

    // Pipeline errors
    #[error("Package {id} {version} appears in multiple closures with differing asset lists")]
    ConflictingPackageAssets { id: String, version: String },

    #[error("No asset compatible with platform {platform} found for required package {package}")]
    UnresolvedPlatformAsset { package: String, platform: String },

    #[error("Optimization failed for {asset}: {reason}")]
    OptimizationFailure { asset: String, reason: String },

    #[error("Materialization failed while {context}")]
    MaterializationIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output directory {0} already contains files")]
    OutputDirConflict(PathBuf),

    #[error("Failed to write manifest {path}: {reason}")]
    ManifestWrite { path: PathBuf, reason: String },

    // IO errors outside the materializer
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}

impl PackstoreError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a materialization error with context
    pub fn materialize(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::MaterializationIo {
            context: context.into(),
            source,
        }
    }

    /// Pipeline stage this error belongs to, if it is a pipeline error
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::ConflictingPackageAssets { .. } => Some(Stage::Merge),
            Self::UnresolvedPlatformAsset { .. } => Some(Stage::Select),
            Self::OptimizationFailure { .. } => Some(Stage::Optimize),
            Self::MaterializationIo { .. } | Self::OutputDirConflict(_) => {
                Some(Stage::Materialize)
            }
            Self::ManifestWrite { .. } => Some(Stage::WriteManifest),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::OutputDirConflict(_) => {
                Some("Pass an empty or nonexistent directory as --output")
            }
            Self::UnresolvedPlatformAsset { .. } => {
                Some("Check the platform id and the fallback chains with: packstore platforms")
            }
            Self::ConflictingPackageAssets { .. } => {
                Some("Re-run the resolver so every closure agrees on the package contents")
            }
            _ => None,
        }
    }
}
