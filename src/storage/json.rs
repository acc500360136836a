use super::AnalyticsStorage;
use crate::analytics::AnalyticsData;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Whole analytics document as one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnalyticsStorage for JsonFileStorage {
    /// A missing file is an empty history. A corrupt one is logged and
    /// treated as empty too, so a damaged file never blocks practice.
    fn load(&self) -> Result<AnalyticsData> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AnalyticsData::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<AnalyticsData>(&bytes) {
            Ok(data) => {
                debug!(path = %self.path.display(), sessions = data.sessions.len(), "analytics loaded");
                Ok(data)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse analytics, starting empty");
                Ok(AnalyticsData::default())
            }
        }
    }

    fn save(&mut self, data: &AnalyticsData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
