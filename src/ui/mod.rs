//! Terminal output helpers

pub mod output;
pub mod progress;

pub use output::{step_warn, summary_line};
pub use progress::TaskSpinner;

use std::io::IsTerminal;

/// Whether fancy output (spinner, colors) is appropriate.
///
/// Plain output is used when stdout is not a TTY or a CI environment is
/// detected.
pub fn interactive() -> bool {
    if !std::io::stdout().is_terminal() {
        return false;
    }
    const CI_VARS: [&str; 5] = [
        "CI",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "BUILDKITE",
        "TF_BUILD",
    ];
    !CI_VARS.iter().any(|var| std::env::var(var).is_ok())
}
