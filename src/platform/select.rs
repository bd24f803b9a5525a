//! Platform asset selection
//!
//! Picks the applicable assets of one package for a fallback chain.
//! Selection runs per asset kind: among the platform-qualified groups of
//! a kind, the most specific group present on the chain wins and the
//! rest are discarded; neutral assets are the terminal fallback for a
//! kind that has qualified groups, and pass through untouched for a kind
//! that has none. Compile-only assets are never candidates.

use crate::closure::{AssetEntry, AssetKind, ResolvedPackage};
use tracing::debug;

/// Select the assets of `package` applicable to a fallback chain.
///
/// An empty result is not an error; the package simply contributes
/// nothing for this platform. The caller decides whether that is fatal
/// (required entry-point packages).
pub fn select_assets(package: &ResolvedPackage, chain: &[String]) -> Vec<AssetEntry> {
    let mut selected = Vec::new();

    for kind in [AssetKind::Managed, AssetKind::Native] {
        select_kind(package, kind, chain, &mut selected);
    }

    debug!(
        "Selected {}/{} assets for {}",
        selected.len(),
        package.assets.len(),
        package.identity
    );
    selected
}

fn select_kind(
    package: &ResolvedPackage,
    kind: AssetKind,
    chain: &[String],
    selected: &mut Vec<AssetEntry>,
) {
    let of_kind = || package.assets.iter().filter(move |a| a.kind == kind);

    // Most specific qualified group on the chain wins
    for tag in chain {
        let mut matched = of_kind()
            .filter(|a| a.platform.as_deref() == Some(tag.as_str()))
            .cloned()
            .peekable();
        if matched.peek().is_some() {
            selected.extend(matched);
            return;
        }
    }

    // Neutral is the terminal fallback
    selected.extend(of_kind().filter(|a| a.platform.is_none()).cloned());
}
