//! Composition manifest
//!
//! `artifact.xml` at the output root lists every package identity that
//! contributed at least one retained asset: one `<Package>` element per
//! identity with `Id` (original casing) and `Version` (exact, prerelease
//! preserved) attributes. Consumers treat the file as a set; entries are
//! written sorted so identical compositions produce identical bytes.

use crate::closure::PackageIdentity;
use crate::error::{PackstoreError, PackstoreResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the manifest at the output root
pub const MANIFEST_FILE_NAME: &str = "artifact.xml";

/// Set of package identities with retained content
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: BTreeSet<PackageIdentity>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contributing package. Re-inserting the same identity is
    /// a no-op, so union across workers is commutative.
    pub fn insert(&mut self, identity: PackageIdentity) {
        self.entries.insert(identity);
    }

    /// Merge another accumulator into this one
    pub fn merge(&mut self, other: Manifest) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.entries.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.entries.iter()
    }

    /// Serialize to the artifact XML document
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str("<StoreArtifacts>\n");
        for entry in &self.entries {
            xml.push_str(&format!(
                "  <Package Id=\"{}\" Version=\"{}\" />\n",
                escape_attr(&entry.id),
                escape_attr(&entry.version.to_string())
            ));
        }
        xml.push_str("</StoreArtifacts>\n");
        xml
    }

    /// Write the manifest into a directory, returning the file path
    pub async fn write(&self, dir: &Path) -> PackstoreResult<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, self.to_xml())
            .await
            .map_err(|e| PackstoreError::ManifestWrite {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!("Wrote manifest with {} entries to {}", self.len(), path.display());
        Ok(path)
    }
}

impl FromIterator<PackageIdentity> for Manifest {
    fn from_iter<I: IntoIterator<Item = PackageIdentity>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Escape a string for use in an XML attribute value
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
