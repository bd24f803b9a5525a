//! Composition pipeline
//!
//! One request runs the stages strictly in order: merge the closures,
//! then fan per-package work (select, filter, optimize, stage) across a
//! bounded worker pool, then publish the staging tree and manifest in
//! one motion. No package's asset set depends on another's, so the
//! per-package stages run concurrently; the manifest is a commutative
//! union merged after all workers finish, so the result is independent
//! of completion order. Nothing is shared across requests.

pub mod baseline;
pub mod manifest;
pub mod materialize;
pub mod optimize;

pub use baseline::BaselineAssetSet;
pub use manifest::{Manifest, MANIFEST_FILE_NAME};
pub use materialize::Materializer;
pub use optimize::{ExternalOptimizer, NoOpOptimizer, Optimizer};

use crate::closure::{
    merge_closures, AssetKind, DependencyClosure, MergedPackage, PackageIdentity,
};
use crate::error::{PackstoreError, PackstoreResult};
use crate::platform::{select_assets, PlatformGraph};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Immutable input for one composition
pub struct CompositionRequest {
    pub closures: Vec<DependencyClosure>,

    /// Target platform identifier
    pub platform: String,

    pub platform_graph: PlatformGraph,

    /// Shared-runtime content to drop; empty set filters nothing
    pub baseline: BaselineAssetSet,

    /// Package ids that must contribute at least one materialized asset
    pub required_packages: Vec<String>,

    pub skip_baseline_removal: bool,

    /// Published output path (decorated with the platform id unless
    /// `decorate_output` is off)
    pub output_dir: PathBuf,

    /// Working directory for staging
    pub staging_dir: PathBuf,

    pub decorate_output: bool,

    /// Keep the staging tree after completion or failure
    pub retain_working_dir: bool,

    /// Worker pool size for per-package stages
    pub workers: usize,
}

impl CompositionRequest {
    /// The directory the composition publishes into
    pub fn effective_output(&self) -> PathBuf {
        if self.decorate_output {
            self.output_dir.join(&self.platform)
        } else {
            self.output_dir.clone()
        }
    }
}

/// Outcome of a completed composition
#[derive(Debug)]
pub struct CompositionResult {
    /// Directory the cache was published into
    pub output_dir: PathBuf,

    /// Package identities with retained content
    pub manifest: Manifest,

    /// Output-relative paths of every materialized asset, sorted
    pub staged_paths: Vec<String>,

    /// Content fingerprint of the retained set, for reproducibility
    /// diagnostics
    pub fingerprint: String,
}

/// Reasonable default for the worker pool size
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Run one composition to completion or failure.
///
/// On failure the output path is untouched and the staging directory is
/// removed unless the request asked to retain it.
pub async fn compose(
    request: CompositionRequest,
    optimizer: Arc<dyn Optimizer>,
) -> PackstoreResult<CompositionResult> {
    if request.closures.is_empty() {
        return Err(PackstoreError::User(
            "at least one closure file is required".to_string(),
        ));
    }

    for closure in &request.closures {
        if let Some(ref p) = closure.platform {
            if *p != request.platform {
                warn!(
                    "Closure {} was resolved for {}, composing for {}",
                    closure.source.display(),
                    p,
                    request.platform
                );
            }
        }
    }

    info!(
        "Composing {} closure(s) for {}",
        request.closures.len(),
        request.platform
    );

    // Merge
    let merged = merge_closures(&request.closures)?;

    // Required packages must at least be present in the merged set.
    // Their original casing is kept for later diagnostics.
    let required: HashSet<String> = request
        .required_packages
        .iter()
        .map(|id| id.to_lowercase())
        .collect();
    let mut required_names: HashMap<String, String> = HashMap::new();
    for id in &required {
        match merged
            .iter()
            .find(|m| m.package.identity.store_id() == *id)
        {
            Some(m) => {
                required_names.insert(id.clone(), m.package.identity.id.clone());
            }
            None => {
                return Err(PackstoreError::UnresolvedPlatformAsset {
                    package: id.clone(),
                    platform: request.platform.clone(),
                });
            }
        }
    }

    let materializer = Arc::new(Materializer::new(
        request.staging_dir.clone(),
        request.effective_output(),
    ));
    materializer.prepare().await?;

    // Select / filter / optimize / stage, one worker per package
    let baseline = Arc::new(request.baseline);
    let semaphore = Arc::new(Semaphore::new(request.workers.max(1)));
    let mut workers = JoinSet::new();

    for entry in merged {
        let chain = request
            .platform_graph
            .chain_for_package(&entry.package.identity.id, &request.platform);

        let baseline = baseline.clone();
        let materializer = materializer.clone();
        let optimizer = optimizer.clone();
        let semaphore = semaphore.clone();
        let skip_baseline_removal = request.skip_baseline_removal;

        workers.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| PackstoreError::Internal(format!("worker pool closed: {e}")))?;
            process_package(
                entry,
                chain,
                &baseline,
                skip_baseline_removal,
                &materializer,
                optimizer.as_ref(),
            )
            .await
        });
    }

    // Drain every worker even after a failure so no write is interrupted
    // mid-file, then report the first error.
    let mut manifest = Manifest::new();
    let mut staged_paths: Vec<String> = Vec::new();
    let mut first_error: Option<PackstoreError> = None;

    while let Some(joined) = workers.join_next().await {
        let outcome = joined
            .map_err(|e| PackstoreError::Internal(format!("worker panicked: {e}")))
            .and_then(|r| r);
        match outcome {
            Ok(Some(contribution)) => {
                staged_paths.extend(contribution.paths);
                manifest.insert(contribution.identity);
            }
            Ok(None) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        materializer.discard(request.retain_working_dir).await;
        return Err(e);
    }

    // Every required package must have contributed at least one
    // materialized asset, across any of its versions.
    for id in &required {
        if !manifest.iter().any(|e| e.store_id() == *id) {
            materializer.discard(request.retain_working_dir).await;
            return Err(PackstoreError::UnresolvedPlatformAsset {
                package: required_names.get(id).cloned().unwrap_or_else(|| id.clone()),
                platform: request.platform.clone(),
            });
        }
    }

    staged_paths.sort();
    let fingerprint = composition_fingerprint(&request.platform, &staged_paths);
    debug!("Composition fingerprint {fingerprint}");

    // Manifest is staged with the assets and published with them, so a
    // manifest failure can never leave a published cache without one.
    if let Err(e) = manifest.write(materializer.staging_dir()).await {
        materializer.discard(request.retain_working_dir).await;
        return Err(e);
    }

    if let Err(e) = materializer.publish(request.retain_working_dir).await {
        // The output was empty before publish started; clear any partial copy
        let _ = tokio::fs::remove_dir_all(materializer.output_dir()).await;
        materializer.discard(request.retain_working_dir).await;
        return Err(e);
    }

    info!(
        "Composed {} package(s), {} file(s), fingerprint {}",
        manifest.len(),
        staged_paths.len(),
        fingerprint
    );

    Ok(CompositionResult {
        output_dir: materializer.output_dir().to_path_buf(),
        manifest,
        staged_paths,
        fingerprint,
    })
}

/// What one package contributed to the composition
struct PackageContribution {
    identity: PackageIdentity,
    /// Output-relative paths of the staged assets
    paths: Vec<String>,
}

async fn process_package(
    entry: MergedPackage,
    chain: Vec<String>,
    baseline: &BaselineAssetSet,
    skip_baseline_removal: bool,
    materializer: &Materializer,
    optimizer: &dyn Optimizer,
) -> PackstoreResult<Option<PackageContribution>> {
    let package = entry.package;
    let identity = package.identity.clone();

    // Select
    let selected = select_assets(&package, &chain);
    if selected.is_empty() {
        return Ok(None);
    }

    // Filter
    let retained = if skip_baseline_removal {
        selected
    } else {
        baseline.retain_assets(&identity, selected)
    };
    if retained.is_empty() {
        debug!("{} fully covered by baseline, dropped", identity);
        return Ok(None);
    }

    // Optimize + stage. Managed assets are written into staging by the
    // optimizer (a no-op optimizer copies them); everything else is a
    // plain copy.
    let mut paths = Vec::with_capacity(retained.len());
    for asset in &retained {
        let mut source = package.root.clone();
        for segment in asset.path.split('/') {
            source.push(segment);
        }

        match asset.kind {
            AssetKind::Managed => {
                let dest = materializer.prepare_slot(&identity, asset).await?;
                optimizer.transform(&asset.path, &source, &dest).await?;
            }
            AssetKind::Native => {
                materializer.stage_copy(&identity, asset, &source).await?;
            }
            // The selector never emits compile-only assets
            AssetKind::Compile => continue,
        }

        paths.push(format!(
            "{}/{}/{}",
            identity.store_id(),
            identity.version,
            asset.path
        ));
    }

    Ok(Some(PackageContribution { identity, paths }))
}

/// Deterministic fingerprint of a retained set.
///
/// Inputs are sorted before hashing so the fingerprint is independent of
/// worker completion order; two identical requests produce the same
/// value.
pub fn composition_fingerprint(platform: &str, paths: &[String]) -> String {
    let mut sorted: Vec<&String> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(platform.as_bytes());
    hasher.update([0]);
    for path in sorted {
        hasher.update(path.as_bytes());
        hasher.update([0]);
    }

    let hash = hex::encode(hasher.finalize());
    hash[..12].to_string()
}
