//! Durable, append-only ledger history.

use crate::domain::error::SlopetraderError;
use crate::domain::ledger::LedgerSnapshot;

pub trait LedgerStore {
    /// Full history in append order, or `None` when nothing was persisted yet.
    fn load(&self) -> Result<Option<Vec<LedgerSnapshot>>, SlopetraderError>;

    /// Append one snapshot. Either the whole row lands or the call fails.
    fn append(&self, snapshot: &LedgerSnapshot) -> Result<(), SlopetraderError>;
}
