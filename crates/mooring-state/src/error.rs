use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Sidechain already exists: {0}")]
    SidechainExists(String),

    #[error("Sidechain not found: {0}")]
    SidechainNotFound(String),

    #[error("Amount out of valid money range")]
    AmountOutOfRange,

    #[error("Sidechain {0} balance pipeline would exceed the money range")]
    BalanceOverflow(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: i64, need: i64 },

    #[error("No immature entry of {need} at maturity height {maturity_height}")]
    ImmatureEntryMismatch { maturity_height: i32, need: i64 },

    #[error("Creation height mismatch: record says {recorded}, disconnecting {got}")]
    CreationHeightMismatch { recorded: i32, got: i32 },

    #[error("No immature amount matures exactly at height {0}")]
    NoMaturityAtHeight(i32),

    #[error("Persistence already initialized")]
    AlreadyInitialized,

    #[error("Persistence not initialized")]
    NotInitialized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Core error: {0}")]
    Core(#[from] mooring_core::CoreError),
}
