//! Domain error types.

/// Top-level error type for slopetrader.
#[derive(Debug, thiserror::Error)]
pub enum SlopetraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("missing column {column}")]
    MissingColumn { column: String },

    #[error("insufficient data for {context}: have {rows} rows, need {minimum}")]
    InsufficientData {
        context: String,
        rows: usize,
        minimum: usize,
    },

    #[error("corrupt ledger at row {row}: {reason}")]
    CorruptLedger { row: usize, reason: String },

    #[error("model error: {reason}")]
    Model { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlopetraderError {
    /// Data insufficiency is recoverable: callers skip the operation.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, SlopetraderError::InsufficientData { .. })
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SlopetraderError::Io(_) => 1,
            SlopetraderError::ConfigParse { .. } | SlopetraderError::ConfigInvalid { .. } => 2,
            SlopetraderError::Storage { .. } | SlopetraderError::MissingColumn { .. } => 3,
            SlopetraderError::Model { .. } => 4,
            SlopetraderError::InsufficientData { .. } => 5,
            SlopetraderError::CorruptLedger { .. } => 6,
        }
    }
}

impl From<&SlopetraderError> for std::process::ExitCode {
    fn from(err: &SlopetraderError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
