//! Bundle transport.
//!
//! The pipeline's only contract with a transporter is "push this file, tell
//! me if it worked". Credentials come from the environment and are never
//! placed on a command line or in a log field.

mod curl;
mod directory;

pub use curl::{Credentials, CurlTransporter};
pub use directory::DirectoryTransporter;

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default environment variable holding the transport user name.
pub const DEFAULT_USER_ENV: &str = "TILESWEEP_TRANSPORT_USER";

/// Default environment variable holding the transport password.
pub const DEFAULT_PASSWORD_ENV: &str = "TILESWEEP_TRANSPORT_PASSWORD";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bundle not found: {}", .0.display())]
    MissingBundle(PathBuf),

    /// Only one of user name and password is set
    #[error("environment variable {0} is not set")]
    MissingCredential(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// The upload command ran and reported failure
    #[error("upload failed ({}): {stderr}", exit_label(.status))]
    Failed { status: Option<i32>, stderr: String },
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Pushes a finished bundle somewhere.
pub trait Transporter: Send + Sync {
    /// Uploads the bundle at `bundle`.
    fn push(&self, bundle: &Path) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Destination for logs, with any embedded secrets removed.
    fn destination(&self) -> String;
}

/// Stand-in for pipelines that stop after bundling. Never pushes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransport;

impl Transporter for NoTransport {
    async fn push(&self, _bundle: &Path) -> Result<(), TransportError> {
        Ok(())
    }

    fn destination(&self) -> String {
        "none".to_string()
    }
}

/// Transporter picked from a configured endpoint string.
///
/// A `scheme://` endpoint other than `file://` is uploaded with curl. A
/// `file://` URL or a plain path is a local drop directory.
#[derive(Debug, Clone)]
pub enum EndpointTransporter {
    Directory(DirectoryTransporter),
    Curl(CurlTransporter),
}

impl EndpointTransporter {
    /// Builds the transporter for `endpoint`. Upload credentials are read
    /// from the named environment variables, only for curl endpoints.
    pub fn from_endpoint(
        endpoint: &str,
        user_env: &str,
        password_env: &str,
    ) -> Result<Self, TransportError> {
        if let Some(path) = endpoint.strip_prefix("file://") {
            return Ok(Self::Directory(DirectoryTransporter::new(path)));
        }
        if endpoint.contains("://") {
            let credentials = Credentials::from_env(user_env, password_env)?;
            return Ok(Self::Curl(CurlTransporter::new(endpoint, credentials)));
        }
        Ok(Self::Directory(DirectoryTransporter::new(endpoint)))
    }
}

impl Transporter for EndpointTransporter {
    async fn push(&self, bundle: &Path) -> Result<(), TransportError> {
        match self {
            Self::Directory(t) => t.push(bundle).await,
            Self::Curl(t) => t.push(bundle).await,
        }
    }

    fn destination(&self) -> String {
        match self {
            Self::Directory(t) => t.destination(),
            Self::Curl(t) => t.destination(),
        }
    }
}

/// Removes `user:password@` from a URL so it can be logged.
pub fn redact_endpoint(endpoint: &str) -> String {
    let Some(scheme_end) = endpoint.find("://") else {
        return endpoint.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &endpoint[authority_start..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!(
            "{}***@{}",
            &endpoint[..authority_start],
            &rest[at + 1..]
        ),
        None => endpoint.to_string(),
    }
}
