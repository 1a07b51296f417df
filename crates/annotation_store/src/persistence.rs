//! Whole-store JSON document: an object keyed by image id.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use annokit_common::ImageAnnotation;
use tracing::{debug, info};

use crate::{error::Result, store::AnnotationStore};

impl AnnotationStore {
    /// Load a saved store. A missing file is an empty store, not an error.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no annotation document, starting empty");
            return Ok(Self::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let records: BTreeMap<String, ImageAnnotation> = serde_json::from_reader(reader)?;
        info!(images = records.len(), path = %path.display(), "loaded annotations");
        Ok(Self::from_records(records))
    }

    /// Write the whole store, pretty-printed, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self.records())?;
        writer.flush()?;
        debug!(images = self.len(), path = %path.display(), "saved annotations");
        Ok(())
    }

    /// [`AnnotationStore::save_json`] followed by [`AnnotationStore::mark_clean`].
    pub fn persist(&mut self, path: &Path) -> Result<()> {
        self.save_json(path)?;
        self.mark_clean();
        Ok(())
    }
}
