//! Feature table access port.

use crate::domain::error::SlopetraderError;
use crate::domain::feature_table::FeatureTable;

pub trait FeatureSource {
    /// Load the whole named table, ordered by timestamp.
    fn load_table(&self, name: &str) -> Result<FeatureTable, SlopetraderError>;

    fn has_table(&self, name: &str) -> bool;
}
