use crate::error::CoreError;

/// Chain-level parameters consumed by the state engine.
///
/// These come from the network's parameter table at process start; the
/// engine treats them as immutable for its lifetime.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Number of blocks after which a forward transfer matures and is
    /// credited to the sidechain balance. Strictly positive.
    pub sc_coins_maturity: i32,
}

impl ChainParams {
    pub fn new(sc_coins_maturity: i32) -> Result<Self, CoreError> {
        if sc_coins_maturity <= 0 {
            return Err(CoreError::InvalidParameter(format!(
                "sc_coins_maturity must be strictly positive, got {sc_coins_maturity}"
            )));
        }
        Ok(ChainParams { sc_coins_maturity })
    }
}

impl Default for ChainParams {
    fn default() -> Self {
        ChainParams {
            sc_coins_maturity: 100,
        }
    }
}
