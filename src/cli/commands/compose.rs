//! Compose command - run the composition pipeline

use crate::cli::args::ComposeArgs;
use crate::closure::DependencyClosure;
use crate::compose::{
    self, BaselineAssetSet, CompositionRequest, ExternalOptimizer, NoOpOptimizer, Optimizer,
};
use crate::error::{PackstoreError, PackstoreResult};
use crate::platform::PlatformGraph;
use crate::ui::{step_warn, summary_line, TaskSpinner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Execute the compose command
pub async fn execute(args: ComposeArgs) -> PackstoreResult<()> {
    let optimizer = build_optimizer(&args);
    debug!("Optimizer: {}", optimizer.name());
    if !args.skip_optimization && args.optimizer.is_none() {
        step_warn("No optimizer configured; managed assets are copied unoptimized");
    }

    let spinner = TaskSpinner::start("Loading closures...");

    let mut closures = Vec::with_capacity(args.closures.len());
    for path in &args.closures {
        closures.push(DependencyClosure::load(path).await?);
    }

    let baseline = match args.baseline {
        Some(ref path) => BaselineAssetSet::load(path).await?,
        None => BaselineAssetSet::empty(),
    };

    let platform_graph = PlatformGraph::resolve(args.platform_graph.as_deref()).await?;

    let staging_dir = match args.staging {
        Some(path) => path,
        None => default_staging_dir()?,
    };
    debug!("Staging directory: {}", staging_dir.display());

    let request = CompositionRequest {
        closures,
        platform: args.platform.clone(),
        platform_graph,
        baseline,
        required_packages: args.required,
        skip_baseline_removal: args.skip_baseline_removal,
        output_dir: args.output,
        staging_dir,
        decorate_output: !args.no_decorate,
        retain_working_dir: args.retain_staging,
        workers: args.workers.unwrap_or_else(compose::default_worker_count),
    };

    spinner.message(&format!("Composing for {}...", args.platform));

    let result = match compose::compose(request, optimizer).await {
        Ok(result) => result,
        Err(e) => {
            spinner.clear();
            return Err(e);
        }
    };

    spinner.finish(&format!("Composed cache for {}", args.platform));
    summary_line("Packages", &result.manifest.len().to_string());
    summary_line("Files", &result.staged_paths.len().to_string());
    summary_line("Output", &result.output_dir.display().to_string());
    summary_line("Fingerprint", &result.fingerprint);

    Ok(())
}

/// Pick the optimizer implementation for this request.
///
/// Disabled optimization is a no-op optimizer, not a branch in the
/// pipeline.
fn build_optimizer(args: &ComposeArgs) -> Arc<dyn Optimizer> {
    if args.skip_optimization {
        return Arc::new(NoOpOptimizer);
    }
    match args.optimizer {
        Some(ref tool) => {
            let mut optimizer = ExternalOptimizer::new(tool.clone());
            if let Some(secs) = args.optimizer_timeout {
                optimizer = optimizer.with_timeout(Duration::from_secs(secs));
            }
            Arc::new(optimizer)
        }
        None => Arc::new(NoOpOptimizer),
    }
}

/// Fresh staging directory under the user state dir
fn default_staging_dir() -> PackstoreResult<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| {
            PackstoreError::Internal("Could not determine state directory".to_string())
        })?
        .join("packstore")
        .join("staging");
    Ok(base.join(uuid::Uuid::new_v4().to_string()))
}
