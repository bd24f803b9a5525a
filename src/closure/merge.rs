//! Closure merging
//!
//! Unifies one or more resolved closures into a single composition set,
//! keyed by package identity. Packages are kept as flat index entries,
//! never as a graph of back-references, so shared nodes and cycles in the
//! upstream dependency graph need no special handling here.

use crate::closure::{AssetEntry, DependencyClosure, ResolvedPackage};
use crate::error::{PackstoreError, PackstoreResult};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// A package in the unified composition set, tagged with the closure
/// files that contributed it. The tag is diagnostic only; it never feeds
/// the manifest.
#[derive(Debug, Clone)]
pub struct MergedPackage {
    pub package: ResolvedPackage,
    pub sources: Vec<PathBuf>,
}

/// Union closures by package identity.
///
/// The same identity contributed twice must carry the identical asset
/// list; a mismatch is fatal. Different versions of one package id stay
/// distinct entries. Output order is first-seen order across the input
/// closures, so it is a function of the inputs alone.
pub fn merge_closures(closures: &[DependencyClosure]) -> PackstoreResult<Vec<MergedPackage>> {
    let mut index: HashMap<(String, semver::Version), usize> = HashMap::new();
    let mut merged: Vec<MergedPackage> = Vec::new();

    for closure in closures {
        for package in &closure.packages {
            let key = (
                package.identity.store_id(),
                package.identity.version.clone(),
            );

            match index.get(&key) {
                Some(&slot) => {
                    let existing = &mut merged[slot];
                    if !asset_lists_match(&existing.package.assets, &package.assets) {
                        return Err(PackstoreError::ConflictingPackageAssets {
                            id: package.identity.id.clone(),
                            version: package.identity.version.to_string(),
                        });
                    }
                    existing.sources.push(closure.source.clone());
                    debug!(
                        "Package {} confirmed by {}",
                        package.identity,
                        closure.source.display()
                    );
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(MergedPackage {
                        package: package.clone(),
                        sources: vec![closure.source.clone()],
                    });
                }
            }
        }
    }

    debug!(
        "Merged {} closures into {} packages",
        closures.len(),
        merged.len()
    );
    Ok(merged)
}

/// Asset lists are declared equal if they contain the same entries,
/// regardless of the order the resolver emitted them in.
fn asset_lists_match(a: &[AssetEntry], b: &[AssetEntry]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted: Vec<&AssetEntry> = a.iter().collect();
    let mut b_sorted: Vec<&AssetEntry> = b.iter().collect();
    let key = |e: &&AssetEntry| (e.path.clone(), e.kind, e.platform.clone());
    a_sorted.sort_by_key(key);
    b_sorted.sort_by_key(key);
    a_sorted == b_sorted
}
