//! Conditional colored output for stderr logging.
//!
//! Color is disabled by the `--no-color` flag, the `NO_COLOR` standard
//! (https://no-color.org/), the application-specific `ZVEROLOV_NO_COLOR`
//! variable, `TERM=dumb`, or a non-TTY stderr.

use colored::ColoredString;
use std::io::{stderr, IsTerminal};
use std::sync::OnceLock;

static COLOR_CONFIG: OnceLock<ColorConfig> = OnceLock::new();

fn should_disable_colors_from_env() -> bool {
    !std::env::var("NO_COLOR").unwrap_or_default().is_empty()
        || !std::env::var("ZVEROLOV_NO_COLOR")
            .unwrap_or_default()
            .is_empty()
        || std::env::var("TERM").unwrap_or_default() == "dumb"
        || !stderr().is_terminal()
}

#[derive(Debug, Clone)]
struct ColorConfig {
    colors_enabled: bool,
}

impl ColorConfig {
    fn new(no_color_flag: bool) -> Self {
        Self {
            colors_enabled: !no_color_flag && !should_disable_colors_from_env(),
        }
    }
}

/// Initialize color configuration from the CLI flag. Call once at startup
/// after argument parsing.
pub fn init_color_config(no_color_flag: bool) {
    let config = ColorConfig::new(no_color_flag);
    COLOR_CONFIG.set(config).unwrap_or_else(|_| {
        eprintln!("Warning: Color configuration already initialized");
    });
}

fn colors_enabled() -> bool {
    COLOR_CONFIG
        .get()
        .map(|config| config.colors_enabled)
        .unwrap_or_else(|| !should_disable_colors_from_env())
}

/// Apply color to a string only if colors are enabled for stderr output
pub fn maybe_color_stderr<F>(text: &str, color_fn: F) -> String
where
    F: FnOnce(&str) -> ColoredString,
{
    if colors_enabled() {
        color_fn(text).to_string()
    } else {
        text.to_string()
    }
}

/// Semantic symbols for operation states, blanked when colors are off.
pub mod symbols {
    use super::colors_enabled;

    pub fn detection_start() -> &'static str {
        if colors_enabled() {
            "🐾"
        } else {
            ""
        }
    }

    pub fn resources_found() -> &'static str {
        if colors_enabled() {
            "🎯"
        } else {
            ""
        }
    }

    pub fn completed_successfully() -> &'static str {
        if colors_enabled() {
            "✅"
        } else {
            "[SUCCESS]"
        }
    }

    pub fn operation_failed() -> &'static str {
        if colors_enabled() {
            "❌"
        } else {
            "[FAILED]"
        }
    }

    pub fn warning() -> &'static str {
        if colors_enabled() {
            "⚠️ "
        } else {
            ""
        }
    }
}

/// Progress bar helpers that respect TTY state and the color settings.
pub mod progress {
    use super::colors_enabled;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::io::{stderr, IsTerminal};

    /// Create a progress bar for batch runs. Only shown when processing more
    /// than one image on an interactive stderr.
    pub fn create_batch_progress_bar(total: usize) -> Option<ProgressBar> {
        if total > 1 && stderr().is_terminal() {
            let pb = ProgressBar::new(total as u64);
            let style = if colors_enabled() {
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:30.green/black}] ({percent}%) {msg}")
                    .unwrap()
                    .progress_chars("█▓▒░")
            } else {
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:30}] ({percent}%) {msg}")
                    .unwrap()
                    .progress_chars("#> ")
            };

            pb.set_style(style);
            Some(pb)
        } else {
            None
        }
    }
}
