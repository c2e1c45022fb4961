//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilesweep::boundary::BoundaryError;
use tilesweep::config::ConfigFileError;
use tilesweep::pipeline::PipelineError;
use tilesweep::provider::ProviderError;
use tilesweep::transport::{TransportError, DEFAULT_PASSWORD_ENV, DEFAULT_USER_ENV};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Boundary files could not be read
    Boundary(BoundaryError),
    /// The run could not start
    Pipeline(PipelineError),
    /// HTTP client could not be built
    Client(ProviderError),
    /// Transport could not be set up
    Transport(TransportError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let Some(hint) = self.hint() {
            eprintln!();
            eprintln!("{}", hint);
        }

        process::exit(2)
    }

    /// Extra guidance printed below the error, if any.
    fn hint(&self) -> Option<String> {
        match self {
            CliError::Boundary(BoundaryError::NoBoundaryFiles(_)) => Some(
                "Pass a directory containing one or more .kml files as the BOUNDARIES argument,\n\
                 e.g. `tilesweep run ./boundaries`."
                    .to_string(),
            ),
            CliError::Transport(TransportError::MissingCredential(_)) => Some(format!(
                "Upload credentials are read from two environment variables\n\
                 (default {} and {}). Set both or neither.",
                DEFAULT_USER_ENV, DEFAULT_PASSWORD_ENV
            )),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Boundary(e) => write!(f, "Failed to read boundaries: {}", e),
            CliError::Pipeline(e) => write!(f, "Cannot start run: {}", e),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Transport(e) => write!(f, "Transport setup failed: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Boundary(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<BoundaryError> for CliError {
    fn from(e: BoundaryError) -> Self {
        CliError::Boundary(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_boundaries_hint_names_positional_argument() {
        let err = CliError::Boundary(BoundaryError::NoBoundaryFiles(PathBuf::from("b")));
        let hint = err.hint().unwrap();
        assert!(hint.contains("BOUNDARIES argument"));
        assert!(!hint.contains("--boundaries"));
    }

    #[test]
    fn test_credential_hint_names_variables() {
        let err = CliError::Transport(TransportError::MissingCredential("X".to_string()));
        let hint = err.hint().unwrap();
        assert!(hint.contains(DEFAULT_USER_ENV));
        assert!(hint.contains(DEFAULT_PASSWORD_ENV));
    }

    #[test]
    fn test_no_hint_for_runtime_error() {
        let err = CliError::Runtime(std::io::Error::other("boom"));
        assert!(err.hint().is_none());
    }
}
