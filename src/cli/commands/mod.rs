//! CLI command implementations

pub mod completions;
pub mod compose;
pub mod platforms;

pub use completions::execute as completions;
pub use compose::execute as compose;
pub use platforms::execute as platforms;
