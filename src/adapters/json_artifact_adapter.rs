//! Model artifacts as JSON files under the models directory.

use crate::domain::error::SlopetraderError;
use crate::domain::inference::ModelArtifact;
use crate::ports::artifact_port::ArtifactStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

pub struct JsonArtifactAdapter {
    base_path: PathBuf,
}

impl JsonArtifactAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn artifact_path(&self, target: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", target))
    }
}

impl<P> ArtifactStore<P> for JsonArtifactAdapter
where
    P: Serialize + DeserializeOwned,
{
    /// Written to a sibling temp file and renamed, so a reader never sees a
    /// half-written artifact.
    fn save(&self, target: &str, artifact: &ModelArtifact<P>) -> Result<(), SlopetraderError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.artifact_path(target);
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, artifact).map_err(|e| SlopetraderError::Storage {
                reason: format!("failed to serialise {}: {}", target, e),
            })?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, target: &str) -> Result<ModelArtifact<P>, SlopetraderError> {
        let path = self.artifact_path(target);
        let file = File::open(&path).map_err(|e| SlopetraderError::Storage {
            reason: format!("no artifact at {}: {}", path.display(), e),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SlopetraderError::Storage {
            reason: format!("failed to read artifact {}: {}", path.display(), e),
        })
    }
}
