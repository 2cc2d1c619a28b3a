use std::collections::BTreeMap;

use mooring_core::{Amount, ScId};
use serde::{Deserialize, Serialize};

/// Per-block record of the amounts a maturation pass moved into
/// sidechain balances, sufficient to rebuild the immature pipeline when
/// the block is disconnected.
///
/// Keyed by sidechain id, then by the height at which each amount was
/// accepted on chain (not its maturity height).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUndo {
    pub sc_amounts: BTreeMap<ScId, BTreeMap<i32, Amount>>,
}

impl BlockUndo {
    pub fn new() -> Self {
        BlockUndo::default()
    }

    /// Record `amount` matured for `sc_id`, accepted at `height`.
    /// Amounts accepted at the same height merge.
    pub fn add(&mut self, sc_id: ScId, height: i32, amount: Amount) {
        *self
            .sc_amounts
            .entry(sc_id)
            .or_default()
            .entry(height)
            .or_insert(0) += amount;
    }

    pub fn is_empty(&self) -> bool {
        self.sc_amounts.is_empty()
    }
}
