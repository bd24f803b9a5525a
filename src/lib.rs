//! packstore - Runtime package cache composer
//!
//! Selects the platform-appropriate files from resolved dependency
//! closures, drops content the target's shared runtime already provides,
//! optionally runs an ahead-of-time optimizer over managed assets, and
//! materializes the result into a deterministic cache directory with an
//! `artifact.xml` manifest.

pub mod cli;
pub mod closure;
pub mod compose;
pub mod error;
pub mod platform;
pub mod ui;

pub use error::{PackstoreError, PackstoreResult};
