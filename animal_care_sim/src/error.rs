// Error types for the animal care simulation.
//
// Only configuration loading can fail. Simulation operations return values or
// conservative defaults instead of errors: an escaped flood fill is `Wild`,
// a broken paired trough is torn down and re-resolved, a missing container
// reads as "no trough".

use std::path::PathBuf;

/// Errors raised while loading a `CareConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config text is not valid JSON for the `CareConfig` schema.
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
