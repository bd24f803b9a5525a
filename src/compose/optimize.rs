//! Ahead-of-time optimization seam
//!
//! The optimizer is an external, opaque transform over managed assets:
//! it may change byte content, never path or identity. The pipeline
//! talks to it through the `Optimizer` trait so a disabled stage is a
//! no-op implementation, not conditional dispatch in the pipeline.
//!
//! A transform failure is fatal to the whole composition. Degrading to a
//! plain copy would mask a packaging defect inside a published cache.

use crate::error::{PackstoreError, PackstoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default time allowed per asset transform
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-asset ahead-of-time transform
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Transform `source` into `dest`. `label` is the package-relative
    /// asset path, used only for diagnostics. The destination's parent
    /// directory already exists.
    async fn transform(&self, label: &str, source: &Path, dest: &Path) -> PackstoreResult<()>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;
}

/// Pass-through used when optimization is skipped or no tool is configured
pub struct NoOpOptimizer;

#[async_trait]
impl Optimizer for NoOpOptimizer {
    async fn transform(&self, label: &str, source: &Path, dest: &Path) -> PackstoreResult<()> {
        tokio::fs::copy(source, dest)
            .await
            .map_err(|e| PackstoreError::materialize(format!("copying {label}"), e))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Invokes an external optimizer tool as `<tool> <source> <dest>`
pub struct ExternalOptimizer {
    tool: PathBuf,
    timeout: Duration,
}

impl ExternalOptimizer {
    pub fn new(tool: PathBuf) -> Self {
        Self {
            tool,
            timeout: DEFAULT_TRANSFORM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Optimizer for ExternalOptimizer {
    async fn transform(&self, label: &str, source: &Path, dest: &Path) -> PackstoreResult<()> {
        debug!("Optimizing {} with {}", label, self.tool.display());

        let mut command = tokio::process::Command::new(&self.tool);
        command.arg(source).arg(dest);

        let run = async {
            let output = command.output().await.map_err(|e| {
                PackstoreError::OptimizationFailure {
                    asset: label.to_string(),
                    reason: format!("failed to launch {}: {}", self.tool.display(), e),
                }
            })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(PackstoreError::OptimizationFailure {
                    asset: label.to_string(),
                    reason: format!(
                        "{} exited with {}: {}",
                        self.tool.display(),
                        output.status,
                        stderr.trim()
                    ),
                });
            }
            Ok(())
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PackstoreError::OptimizationFailure {
                    asset: label.to_string(),
                    reason: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
        }

        // The tool must produce the destination it was asked for
        if !dest.exists() {
            return Err(PackstoreError::OptimizationFailure {
                asset: label.to_string(),
                reason: format!("{} produced no output file", self.tool.display()),
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "external"
    }
}
