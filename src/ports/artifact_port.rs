//! Persisted (scaler, model) pairs keyed by target name.

use crate::domain::error::SlopetraderError;
use crate::domain::inference::ModelArtifact;

pub trait ArtifactStore<P> {
    fn save(&self, target: &str, artifact: &ModelArtifact<P>) -> Result<(), SlopetraderError>;

    fn load(&self, target: &str) -> Result<ModelArtifact<P>, SlopetraderError>;
}
