//! Challenge staging.
//!
//! [`StagingUploader`] implements [`UploadSink`] by writing every
//! challenged capture to `<root>/<category>/<id>.ppm`, then handing the
//! ticket to an optional remote sink.  The local copy survives a remote
//! failure, so a reviewer can still find it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::image_store::category_dir;
use crate::app::ports::{StoreError, UploadError, UploadSink};
use crate::control::challenge::UploadTicket;

pub struct StagingUploader {
    root: PathBuf,
    remote: Option<Box<dyn UploadSink>>,
}

impl StagingUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote: None,
        }
    }

    /// Forward tickets to `remote` after staging them locally.
    pub fn with_remote(mut self, remote: Box<dyn UploadSink>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `ticket` is (or would be) staged.
    pub fn staged_path(&self, ticket: &UploadTicket) -> PathBuf {
        self.root
            .join(&ticket.category_name)
            .join(format!("{}.ppm", ticket.generated_id))
    }
}

impl UploadSink for StagingUploader {
    fn upload(&mut self, ticket: &UploadTicket) -> Result<(), UploadError> {
        let dir = category_dir(&self.root, &ticket.category_name).map_err(|e| match e {
            StoreError::InvalidCategory => UploadError::Rejected,
            StoreError::IoError => UploadError::IoError,
        })?;
        let path = dir.join(format!("{}.ppm", ticket.generated_id));
        fs::write(&path, ticket.image.to_ppm()).map_err(|_| UploadError::IoError)?;
        info!("Challenge staged at {}", path.display());

        if let Some(remote) = self.remote.as_mut() {
            remote.upload(ticket).inspect_err(|e| {
                warn!("Remote upload of {} failed: {}", ticket, e);
            })?;
        }
        Ok(())
    }
}
