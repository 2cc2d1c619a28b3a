use std::collections::BTreeMap;
use std::fmt;

use mooring_core::{money_range, Amount, Hash};
use serde::{Deserialize, Serialize};

/// The committed record of one live sidechain.
///
/// `balance` holds matured forwards net of outbound transfers (signed for
/// the latter, non-negative on every in-scope path). `immature_amounts`
/// maps maturity height to the amount that becomes balance there; keys
/// iterate in ascending height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainInfo {
    /// Hash of the main-chain block containing the creation transaction.
    pub creation_block_hash: Hash,
    /// Height of that block; -1 until set.
    pub creation_block_height: i32,
    /// Hash of the creation transaction.
    pub creation_tx_hash: Hash,
    /// Matured funds forwarded to this sidechain.
    pub balance: Amount,
    /// Opaque creation parameters, carried verbatim.
    pub creation_data: Vec<u8>,
    /// Pending forwards, keyed by the height at which they mature.
    pub immature_amounts: BTreeMap<i32, Amount>,
}

impl Default for SidechainInfo {
    fn default() -> Self {
        SidechainInfo {
            creation_block_hash: Hash::ZERO,
            creation_block_height: -1,
            creation_tx_hash: Hash::ZERO,
            balance: 0,
            creation_data: Vec::new(),
            immature_amounts: BTreeMap::new(),
        }
    }
}

impl SidechainInfo {
    /// Sum of all pending immature amounts. `None` on overflow.
    pub fn immature_total(&self) -> Option<Amount> {
        self.immature_amounts
            .values()
            .try_fold(0i64, |acc, v| acc.checked_add(*v))
    }

    /// Whether `balance >= 0` and `balance + sum(immature) <= MAX_MONEY`.
    pub fn within_money_range(&self) -> bool {
        if self.balance < 0 {
            return false;
        }
        match self
            .immature_total()
            .and_then(|total| total.checked_add(self.balance))
        {
            Some(pipeline) => money_range(pipeline),
            None => false,
        }
    }
}

impl fmt::Display for SidechainInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  creation block {}", self.creation_block_hash)?;
        writeln!(f, "  creation height {}", self.creation_block_height)?;
        writeln!(f, "  creation tx {}", self.creation_tx_hash)?;
        writeln!(f, "  balance {}", self.balance)?;
        writeln!(f, "  creation data {} bytes", self.creation_data.len())?;
        for (height, amount) in &self.immature_amounts {
            writeln!(f, "  immature {amount} at height {height}")?;
        }
        Ok(())
    }
}
