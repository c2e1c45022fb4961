//! Upload through the system `curl`.

use super::{redact_endpoint, TransportError, Transporter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// User name and password for the upload endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from two environment variables.
    ///
    /// Both unset means anonymous upload (`Ok(None)`); only one set is an
    /// error.
    pub fn from_env(user_var: &str, password_var: &str) -> Result<Option<Self>, TransportError> {
        let user = std::env::var(user_var).ok();
        let password = std::env::var(password_var).ok();
        match (user, password) {
            (Some(user), Some(password)) => Ok(Some(Self::new(user, password))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(TransportError::MissingCredential(password_var.to_string())),
            (None, Some(_)) => Err(TransportError::MissingCredential(user_var.to_string())),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// curl config line, read from stdin with `-K -`.
    ///
    /// Always a single line: line breaks in either value are escaped.
    fn curl_config(&self) -> String {
        format!(
            "user = \"{}:{}\"\n",
            escape_config_value(&self.user),
            escape_config_value(&self.password)
        )
    }
}

/// Escapes a value for a double-quoted curl config string.
fn escape_config_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x0b' => escaped.push_str("\\v"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Uploads with `curl -T <bundle> <endpoint>`.
///
/// Works for any protocol curl supports for uploads (FTP, SFTP, HTTP PUT).
#[derive(Debug, Clone)]
pub struct CurlTransporter {
    endpoint: String,
    credentials: Option<Credentials>,
    program: PathBuf,
}

impl CurlTransporter {
    pub fn new(endpoint: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            program: PathBuf::from("curl"),
        }
    }

    /// Uses a different curl binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

impl Transporter for CurlTransporter {
    async fn push(&self, bundle: &Path) -> Result<(), TransportError> {
        if !bundle.is_file() {
            return Err(TransportError::MissingBundle(bundle.to_path_buf()));
        }

        let mut command = Command::new(&self.program);
        command
            .arg("--fail")
            .arg("--silent")
            .arg("--show-error")
            .arg("-T")
            .arg(bundle)
            .arg(&self.endpoint)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.credentials.is_some() {
            command.arg("-K").arg("-").stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }

        debug!(
            bundle = %bundle.display(),
            endpoint = %redact_endpoint(&self.endpoint),
            authenticated = self.credentials.is_some(),
            "Starting curl upload"
        );

        let mut child = command.spawn().map_err(|source| TransportError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if let (Some(credentials), Some(mut stdin)) = (&self.credentials, child.stdin.take()) {
            stdin
                .write_all(credentials.curl_config().as_bytes())
                .await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(TransportError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(
            bundle = %bundle.display(),
            endpoint = %redact_endpoint(&self.endpoint),
            "Bundle uploaded"
        );
        Ok(())
    }

    fn destination(&self) -> String {
        redact_endpoint(&self.endpoint)
    }
}
