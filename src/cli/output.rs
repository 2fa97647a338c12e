use clap::ValueEnum;

/// How command results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Tables and summaries for a terminal
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// When to use colors on the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Forced setting for this mode; `None` leaves the decision to the terminal.
    pub fn forced(self) -> Option<bool> {
        match self {
            ColorMode::Auto => None,
            ColorMode::Always => Some(true),
            ColorMode::Never => Some(false),
        }
    }
}
