//! Settings sections of the application config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How evaluation passes are run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Run independent processors of one dependency wave on worker threads
    pub parallel: bool,

    /// Upper bound on worker threads per wave
    pub max_threads: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            max_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl EvaluationSettings {
    pub fn parallel(max_threads: usize) -> Self {
        Self {
            parallel: true,
            max_threads: max_threads.max(1),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Directory for daily-rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,visnet=debug".to_string(),
            log_dir: None,
        }
    }
}

/// Converter registry behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Log a warning when a converter registration replaces another
    pub warn_on_override: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            warn_on_override: true,
        }
    }
}
