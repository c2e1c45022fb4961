//! Copy the bundle into a local drop directory.

use super::{TransportError, Transporter};
use crate::layout::partial_sibling;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Delivers bundles by copying them into a directory, e.g. a mounted share
/// that another system picks up from.
#[derive(Debug, Clone)]
pub struct DirectoryTransporter {
    dir: PathBuf,
}

impl DirectoryTransporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Transporter for DirectoryTransporter {
    async fn push(&self, bundle: &Path) -> Result<(), TransportError> {
        let Some(name) = bundle.file_name() else {
            return Err(TransportError::MissingBundle(bundle.to_path_buf()));
        };
        if !bundle.is_file() {
            return Err(TransportError::MissingBundle(bundle.to_path_buf()));
        }

        fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(name);
        let partial = partial_sibling(&target);
        fs::copy(bundle, &partial).await?;
        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        info!(bundle = %bundle.display(), target = %target.display(), "Bundle delivered");
        Ok(())
    }

    fn destination(&self) -> String {
        self.dir.display().to_string()
    }
}
