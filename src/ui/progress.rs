//! Progress indicators with CI fallback

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner that degrades to plain lines when not interactive
pub struct TaskSpinner {
    bar: Option<ProgressBar>,
}

impl TaskSpinner {
    /// Start a spinner with a message
    pub fn start(message: &str) -> Self {
        let bar = if super::interactive() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
            );
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{} {}", style("...").dim(), message);
            None
        };
        Self { bar }
    }

    /// Update the spinner message
    pub fn message(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Stop with a success message
    pub fn finish(self, message: &str) {
        match self.bar {
            Some(bar) => {
                bar.disable_steady_tick();
                bar.finish_and_clear();
                println!("{} {}", style("✓").green(), message);
            }
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    /// Stop and clear without a message (error paths print their own)
    pub fn clear(self) {
        if let Some(bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
