//! Cache materialization
//!
//! All writes land in a staging directory first; the output path only
//! ever sees the complete result, moved or copied in one publish step.
//! On failure the staging directory is deleted unless the caller asked
//! to keep it for diagnosis, and the output path is left untouched.
//!
//! Staging layout mirrors the published layout:
//! `<staging>/<lowercased id>/<version>/<package-relative path>`.

use crate::closure::{AssetEntry, PackageIdentity};
use crate::error::{PackstoreError, PackstoreResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Stages retained assets and publishes the finished tree
#[derive(Debug)]
pub struct Materializer {
    staging: PathBuf,
    output: PathBuf,
}

impl Materializer {
    pub fn new(staging: PathBuf, output: PathBuf) -> Self {
        Self { staging, output }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Create the staging directory and verify the output path is fresh.
    /// Checking the output up front avoids staging work that could never
    /// publish without breaking the exclusivity guarantee.
    pub async fn prepare(&self) -> PackstoreResult<()> {
        if dir_has_entries(&self.output).await? {
            return Err(PackstoreError::OutputDirConflict(self.output.clone()));
        }

        fs::create_dir_all(&self.staging).await.map_err(|e| {
            PackstoreError::materialize(
                format!("creating staging directory {}", self.staging.display()),
                e,
            )
        })?;

        debug!("Staging at {}", self.staging.display());
        Ok(())
    }

    /// Staging destination for one asset of one package
    pub fn staged_path(&self, identity: &PackageIdentity, asset: &AssetEntry) -> PathBuf {
        let mut path = self.staging.join(identity.store_dir());
        for segment in asset.path.split('/') {
            path.push(segment);
        }
        path
    }

    /// Create the parent directory for a staged asset and return its path
    pub async fn prepare_slot(
        &self,
        identity: &PackageIdentity,
        asset: &AssetEntry,
    ) -> PackstoreResult<PathBuf> {
        let dest = self.staged_path(identity, asset);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PackstoreError::materialize(
                    format!("creating directory {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(dest)
    }

    /// Copy one asset into staging unchanged
    pub async fn stage_copy(
        &self,
        identity: &PackageIdentity,
        asset: &AssetEntry,
        source: &Path,
    ) -> PackstoreResult<PathBuf> {
        let dest = self.prepare_slot(identity, asset).await?;
        fs::copy(source, &dest).await.map_err(|e| {
            PackstoreError::materialize(
                format!("copying {} for {}", asset.path, identity),
                e,
            )
        })?;
        Ok(dest)
    }

    /// Publish the staging tree to the output path.
    ///
    /// With `retain_staging` the tree is copied so the working directory
    /// survives for inspection; otherwise a rename is attempted first and
    /// a copy-then-delete fallback handles cross-device staging.
    pub async fn publish(&self, retain_staging: bool) -> PackstoreResult<()> {
        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PackstoreError::materialize(
                    format!("creating output parent {}", parent.display()),
                    e,
                )
            })?;
        }

        // The conflict check ran at prepare(); re-check in case something
        // appeared while workers were staging.
        if dir_has_entries(&self.output).await? {
            return Err(PackstoreError::OutputDirConflict(self.output.clone()));
        }
        if self.output.exists() {
            fs::remove_dir(&self.output).await.map_err(|e| {
                PackstoreError::materialize(
                    format!("replacing empty output {}", self.output.display()),
                    e,
                )
            })?;
        }

        if !retain_staging {
            match fs::rename(&self.staging, &self.output).await {
                Ok(()) => {
                    info!("Published {}", self.output.display());
                    return Ok(());
                }
                Err(e) => {
                    debug!("Rename publish failed ({e}), falling back to copy");
                }
            }
        }

        copy_tree(&self.staging, &self.output).await?;
        if !retain_staging {
            self.cleanup().await?;
        }
        info!("Published {}", self.output.display());
        Ok(())
    }

    /// Remove the staging directory
    pub async fn cleanup(&self) -> PackstoreResult<()> {
        if self.staging.exists() {
            fs::remove_dir_all(&self.staging).await.map_err(|e| {
                PackstoreError::materialize(
                    format!("removing staging directory {}", self.staging.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Remove staging after a failed composition, honoring the retain flag
    pub async fn discard(&self, retain_staging: bool) {
        if retain_staging {
            info!("Keeping working directory {}", self.staging.display());
            return;
        }
        // Failure path; the original error matters more than cleanup noise
        if let Err(e) = self.cleanup().await {
            debug!("Staging cleanup failed: {e}");
        }
    }
}

/// Whether a directory exists and contains at least one entry
async fn dir_has_entries(dir: &Path) -> PackstoreResult<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        PackstoreError::materialize(format!("reading output directory {}", dir.display()), e)
    })?;
    let first = entries.next_entry().await.map_err(|e| {
        PackstoreError::materialize(format!("reading output directory {}", dir.display()), e)
    })?;
    Ok(first.is_some())
}

/// Recursive directory copy; preserves the relative layout only
async fn copy_tree(from: &Path, to: &Path) -> PackstoreResult<()> {
    fs::create_dir_all(to)
        .await
        .map_err(|e| PackstoreError::materialize(format!("creating {}", to.display()), e))?;

    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src_dir, dst_dir)) = pending.pop() {
        let mut entries = fs::read_dir(&src_dir).await.map_err(|e| {
            PackstoreError::materialize(format!("reading {}", src_dir.display()), e)
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            PackstoreError::materialize(format!("reading {}", src_dir.display()), e)
        })? {
            let src = entry.path();
            let dst = dst_dir.join(entry.file_name());
            let file_type = entry.file_type().await.map_err(|e| {
                PackstoreError::materialize(format!("inspecting {}", src.display()), e)
            })?;

            if file_type.is_dir() {
                fs::create_dir_all(&dst).await.map_err(|e| {
                    PackstoreError::materialize(format!("creating {}", dst.display()), e)
                })?;
                pending.push((src, dst));
            } else {
                fs::copy(&src, &dst).await.map_err(|e| {
                    PackstoreError::materialize(format!("copying {}", src.display()), e)
                })?;
            }
        }
    }
    Ok(())
}
