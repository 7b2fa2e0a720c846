//! User-facing error reports.
//!
//! Configuration and packaging errors are shown with the settings that
//! caused them and the changes that would make the configuration valid.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a build or install step fails.
    pub const BUILD_FAILED: &str = "help: Run `clhep-recipe create --verbose` for more details";

    /// Suggestion when a version is not in the recipe.
    pub const UNKNOWN_VERSION: &str =
        "help: Run `clhep-recipe info --list-versions` to see the packaged versions";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str =
        "help: Check your network connection, or disable `net.offline` in the config";

    /// Suggestion when CMake is missing.
    pub const CMAKE_MISSING: &str = "help: Install CMake and ensure it's in your PATH";
}

const RED: &str = "\x1b[1;31m";
const GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// An error report with the settings involved and possible fixes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    /// Settings or values that led to the error
    pub context: Vec<String>,
    /// Changes that would avoid the error
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("{}{}{}", code, text, RESET)
            } else {
                text.to_string()
            }
        };

        let mut output = format!("{}: {}\n", paint(RED, "error"), self.message);
        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push_str(&format!("\n{}: consider:\n", paint(GREEN, "help")));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
