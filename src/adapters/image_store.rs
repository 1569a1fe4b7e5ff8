//! Local dataset capture.
//!
//! [`DatasetStore`] implements [`ImageStore`] by writing each classified
//! frame to `<root>/<category>/<n>.ppm`, where `n` is the number of files
//! already in that category directory.  The tree doubles as a training
//! set for the next model.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::{ImageStore, StoreError};
use crate::frame::Frame;

pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A category name usable as a single directory component.
pub(crate) fn category_dir(root: &Path, category: &str) -> Result<PathBuf, StoreError> {
    let plain = !category.is_empty()
        && category != "."
        && category != ".."
        && !category.contains(['/', '\\', '\0']);
    if !plain {
        return Err(StoreError::InvalidCategory);
    }
    let dir = root.join(category);
    fs::create_dir_all(&dir).map_err(|_| StoreError::IoError)?;
    Ok(dir)
}

impl ImageStore for DatasetStore {
    fn save(&mut self, frame: &Frame, category: &str) -> Result<PathBuf, StoreError> {
        let dir = category_dir(&self.root, category)?;
        let existing = fs::read_dir(&dir)
            .map_err(|_| StoreError::IoError)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .count();

        let path = dir.join(format!("{existing}.ppm"));
        fs::write(&path, frame.to_ppm()).map_err(|_| StoreError::IoError)?;
        debug!("DatasetStore: {} bytes", frame.pixels().len());
        info!("Saved {}", path.display());
        Ok(path)
    }
}
