//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use mediastash::CacheError;

/// CLI-specific errors with consistent formatting and exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging.
    LoggingInit(String),
    /// Bad argument or manifest content.
    Config(String),
    /// Failed to open or maintain the cache.
    Cache(CacheError),
    /// Failed to read a manifest file.
    ManifestRead { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::ManifestRead { .. } = self {
            eprintln!();
            eprintln!("The manifest is a JSON array of content items:");
            eprintln!(
                r#"  [{{"id": "c1", "creator_id": "alice", "kind": "image", "url": "https://..."}}]"#
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Cache(e) => write!(f, "cache error: {}", e),
            CliError::ManifestRead { path, error } => {
                write!(f, "failed to read manifest {}: {}", path, error)
            }
        }
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
