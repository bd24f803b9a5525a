//! Output functions for consistent CLI formatting

use console::style;

/// Display a warning step
pub fn step_warn(message: &str) {
    println!("  {} {}", style("[WARN]").yellow(), message);
}

/// Display a label/value summary line
pub fn summary_line(label: &str, value: &str) {
    println!("  {:<12} {}", style(label).bold(), value);
}
