use std::collections::{BTreeMap, BTreeSet};

use mooring_core::{Amount, Block, ScId, ScOutput, Transaction};
use tracing::{debug, warn};

use crate::error::StateError;
use crate::info::SidechainInfo;
use crate::manager::SidechainManager;
use crate::undo::BlockUndo;

/// Transactional overlay over the manager's committed sidechain map.
///
/// A block-processing pass creates one view, stages every relevant
/// transaction's effects into it, and either commits the whole overlay
/// with [`flush`](Self::flush) or drops it. The overlay itself is the
/// rollback unit: staging operations make no attempt at partial undo,
/// and a failed operation leaves the view fit only for discarding.
///
/// Committed records are lazy-loaded into the overlay on first mutating
/// touch. Views are single-threaded and must not outlive the block
/// processing pass that created them.
pub struct CoinsViewCache<'a> {
    mgr: &'a SidechainManager,
    /// Records created or touched-for-mutation in this view.
    cache: BTreeMap<ScId, SidechainInfo>,
    /// Committed ids whose record must be removed on flush.
    erase: BTreeSet<ScId>,
    /// Ids in `cache` whose content must be written on flush.
    dirty: BTreeSet<ScId>,
}

impl<'a> CoinsViewCache<'a> {
    pub fn new(mgr: &'a SidechainManager) -> Self {
        CoinsViewCache {
            mgr,
            cache: BTreeMap::new(),
            erase: BTreeSet::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub(crate) fn is_erased(&self, sc_id: &ScId) -> bool {
        self.erase.contains(sc_id)
    }

    pub(crate) fn holds(&self, sc_id: &ScId) -> bool {
        self.cache.contains_key(sc_id)
    }

    /// Whether `sc_id` is visible through this view.
    pub fn sidechain_exists(&self, sc_id: &ScId) -> bool {
        self.mgr.sidechain_exists(sc_id, Some(self))
    }

    /// Copy of the record visible through this view.
    pub fn get_sc_info(&self, sc_id: &ScId) -> Option<SidechainInfo> {
        if self.erase.contains(sc_id) {
            return None;
        }
        if let Some(info) = self.cache.get(sc_id) {
            return Some(info.clone());
        }
        self.mgr.get_sc_info(sc_id)
    }

    /// The full map visible through this view: the committed map with
    /// the overlay applied.
    pub fn get_sc_info_map(&self) -> BTreeMap<ScId, SidechainInfo> {
        let mut map = self.mgr.get_sc_info_map();
        for sc_id in &self.erase {
            map.remove(sc_id);
        }
        for (sc_id, info) in &self.cache {
            map.insert(*sc_id, info.clone());
        }
        map
    }

    /// Mutable access to a visible record, lazy-loading the committed
    /// version into the overlay on first touch.
    fn fetch_mut(&mut self, sc_id: &ScId) -> Option<&mut SidechainInfo> {
        if self.erase.contains(sc_id) {
            return None;
        }
        if !self.cache.contains_key(sc_id) {
            let committed = self.mgr.get_sc_info(sc_id)?;
            self.cache.insert(*sc_id, committed);
        }
        self.cache.get_mut(sc_id)
    }

    /// Apply a transaction's sidechain outputs at `height`, in output
    /// order.
    ///
    /// On failure the outputs already applied stay in the overlay;
    /// callers needing all-or-nothing semantics discard the whole view.
    pub fn update_sc_info(
        &mut self,
        tx: &Transaction,
        block: &Block,
        height: i32,
    ) -> Result<(), StateError> {
        let tx_hash = tx.hash()?;
        let block_hash = block.hash()?;
        let maturity_height = height + self.mgr.params().sc_coins_maturity;

        for output in &tx.sc_outputs {
            match output {
                ScOutput::Creation { sc_id, data } => {
                    if self.sidechain_exists(sc_id) {
                        warn!("Sidechain {} already exists, cannot create", sc_id);
                        return Err(StateError::SidechainExists(sc_id.to_string()));
                    }
                    self.erase.remove(sc_id);
                    self.cache.insert(
                        *sc_id,
                        SidechainInfo {
                            creation_block_hash: block_hash,
                            creation_block_height: height,
                            creation_tx_hash: tx_hash,
                            balance: 0,
                            creation_data: data.clone(),
                            immature_amounts: BTreeMap::new(),
                        },
                    );
                    self.dirty.insert(*sc_id);
                    debug!("Created sidechain {} at height {}", sc_id, height);
                }
                ScOutput::Forward { sc_id, amount } => {
                    let info = self
                        .fetch_mut(sc_id)
                        .ok_or_else(|| StateError::SidechainNotFound(sc_id.to_string()))?;
                    let entry = info.immature_amounts.entry(maturity_height).or_insert(0);
                    *entry = entry
                        .checked_add(*amount)
                        .ok_or_else(|| StateError::BalanceOverflow(sc_id.to_string()))?;
                    if !info.within_money_range() {
                        warn!("Forward transfer overflows sidechain {} pipeline", sc_id);
                        return Err(StateError::BalanceOverflow(sc_id.to_string()));
                    }
                    self.dirty.insert(*sc_id);
                    debug!(
                        "Forward of {} to sidechain {}, matures at height {}",
                        amount, sc_id, maturity_height
                    );
                }
            }
        }
        Ok(())
    }

    /// Undo a transaction's sidechain outputs during block disconnect,
    /// in reverse output order. `height` is the height the block held.
    ///
    /// Any failure aborts the remaining reversals; the view then holds
    /// a partially reverted state and must be discarded.
    pub fn revert_tx_outputs(&mut self, tx: &Transaction, height: i32) -> Result<(), StateError> {
        let maturity_height = height + self.mgr.params().sc_coins_maturity;

        for output in tx.sc_outputs.iter().rev() {
            match output {
                ScOutput::Forward { sc_id, amount } => {
                    let info = self
                        .fetch_mut(sc_id)
                        .ok_or_else(|| StateError::SidechainNotFound(sc_id.to_string()))?;
                    match info.immature_amounts.get_mut(&maturity_height) {
                        Some(entry) if *entry >= *amount => {
                            *entry -= amount;
                            if *entry == 0 {
                                info.immature_amounts.remove(&maturity_height);
                            }
                        }
                        _ => {
                            warn!(
                                "Cannot revert forward of {} to {} at maturity height {}",
                                amount, sc_id, maturity_height
                            );
                            return Err(StateError::ImmatureEntryMismatch {
                                maturity_height,
                                need: *amount,
                            });
                        }
                    }
                    self.dirty.insert(*sc_id);
                    debug!("Reverted forward of {} to sidechain {}", amount, sc_id);
                }
                ScOutput::Creation { sc_id, .. } => {
                    let info = self
                        .fetch_mut(sc_id)
                        .ok_or_else(|| StateError::SidechainNotFound(sc_id.to_string()))?;
                    if info.creation_block_height != height {
                        let recorded = info.creation_block_height;
                        warn!(
                            "Sidechain {} created at height {}, cannot revert at {}",
                            sc_id, recorded, height
                        );
                        return Err(StateError::CreationHeightMismatch {
                            recorded,
                            got: height,
                        });
                    }
                    self.cache.remove(sc_id);
                    self.dirty.remove(sc_id);
                    if self.mgr.sidechain_exists(sc_id, None) {
                        self.erase.insert(*sc_id);
                    }
                    debug!("Reverted creation of sidechain {}", sc_id);
                }
            }
        }
        Ok(())
    }

    /// Credit every immature amount due by `height` to its sidechain
    /// balance, recording what moved into `undo`.
    ///
    /// Maturation is block-paced: the call must land exactly on the
    /// maturity height of at least one pending entry, otherwise the
    /// driver skipped a height and the call fails. Entries already
    /// overdue are still swept into balances and `undo` before the
    /// failure is reported; the caller discards the view on error.
    pub fn apply_mature_balances(
        &mut self,
        height: i32,
        undo: &mut BlockUndo,
    ) -> Result<(), StateError> {
        let maturity = self.mgr.params().sc_coins_maturity;
        let mut matured_exactly = false;

        let mut candidates = self.mgr.get_sc_id_set();
        candidates.extend(self.cache.keys().copied());

        for sc_id in candidates {
            if self.erase.contains(&sc_id) {
                continue;
            }
            let due: Vec<(i32, Amount)> = match self.get_sc_info(&sc_id) {
                Some(info) => info
                    .immature_amounts
                    .range(..=height)
                    .map(|(h, a)| (*h, *a))
                    .collect(),
                None => continue,
            };
            if due.is_empty() {
                continue;
            }

            let Some(info) = self.fetch_mut(&sc_id) else {
                continue;
            };
            for (due_height, amount) in due {
                if due_height == height {
                    matured_exactly = true;
                }
                info.balance = info
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| StateError::BalanceOverflow(sc_id.to_string()))?;
                info.immature_amounts.remove(&due_height);
                undo.add(sc_id, due_height - maturity, amount);
                debug!(
                    "Matured {} for sidechain {} (due at {}, processed at {})",
                    amount, sc_id, due_height, height
                );
            }
            self.dirty.insert(sc_id);
        }

        if !matured_exactly {
            warn!("No immature amount matures exactly at height {}", height);
            return Err(StateError::NoMaturityAtHeight(height));
        }
        Ok(())
    }

    /// Rebuild the immature pipeline from a block-undo record while the
    /// block at `height` is disconnected: the inverse of
    /// [`apply_mature_balances`](Self::apply_mature_balances).
    ///
    /// Each sidechain's undo slice is validated before any of it is
    /// applied, so a failing sidechain is left unmodified.
    pub fn restore_immature_balances(
        &mut self,
        height: i32,
        undo: &BlockUndo,
    ) -> Result<(), StateError> {
        let maturity = self.mgr.params().sc_coins_maturity;

        for (sc_id, per_height) in &undo.sc_amounts {
            let visible = self
                .get_sc_info(sc_id)
                .ok_or_else(|| StateError::SidechainNotFound(sc_id.to_string()))?;
            let total = per_height
                .values()
                .try_fold(0i64, |acc, v| acc.checked_add(*v))
                .ok_or(StateError::AmountOutOfRange)?;
            if visible.balance < total {
                warn!(
                    "Cannot restore {} to sidechain {}: balance is {}",
                    total, sc_id, visible.balance
                );
                return Err(StateError::InsufficientBalance {
                    have: visible.balance,
                    need: total,
                });
            }

            let info = self
                .fetch_mut(sc_id)
                .ok_or_else(|| StateError::SidechainNotFound(sc_id.to_string()))?;
            for (orig_height, amount) in per_height {
                info.balance -= amount;
                let entry = info
                    .immature_amounts
                    .entry(orig_height + maturity)
                    .or_insert(0);
                *entry = entry
                    .checked_add(*amount)
                    .ok_or_else(|| StateError::BalanceOverflow(sc_id.to_string()))?;
            }
            self.dirty.insert(*sc_id);
            debug!(
                "Restored {} immature value to sidechain {} at disconnect height {}",
                total, sc_id, height
            );
        }
        Ok(())
    }

    /// Commit the overlay into the manager and its store, atomically
    /// with respect to concurrent readers, then clear the overlay.
    pub fn flush(&mut self) -> Result<(), StateError> {
        self.mgr.apply_flush(&self.erase, &self.cache, &self.dirty)?;
        self.cache.clear();
        self.erase.clear();
        self.dirty.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::PersistencePolicy;
    use mooring_core::{ChainParams, Hash, PayloadKind, ScOutput};

    fn stub_manager() -> SidechainManager {
        let mgr = SidechainManager::new(ChainParams::default());
        mgr.init_persistence(0, false, PersistencePolicy::Stub)
            .unwrap();
        mgr
    }

    fn creation_tx(sc_id: Hash, amount: i64) -> Transaction {
        Transaction::new(
            PayloadKind::Transparent,
            1,
            vec![
                ScOutput::Creation {
                    sc_id,
                    data: vec![],
                },
                ScOutput::Forward { sc_id, amount },
            ],
        )
    }

    #[test]
    fn test_lazy_load_on_forward_to_committed_sidechain() {
        let mgr = stub_manager();
        let sc_id = Hash::from_hex("1492").unwrap();

        let mut view = CoinsViewCache::new(&mgr);
        view.update_sc_info(&creation_tx(sc_id, 10), &Block::default(), 5)
            .unwrap();
        view.flush().unwrap();
        assert!(!view.holds(&sc_id));

        let fwd = Transaction::new(
            PayloadKind::Transparent,
            2,
            vec![ScOutput::Forward { sc_id, amount: 3 }],
        );
        view.update_sc_info(&fwd, &Block::default(), 6).unwrap();
        assert!(view.holds(&sc_id));
    }

    #[test]
    fn test_erase_and_dirty_stay_disjoint() {
        let mgr = stub_manager();
        let sc_id = Hash::from_hex("a1b2").unwrap();
        let tx = creation_tx(sc_id, 10);

        let mut view = CoinsViewCache::new(&mgr);
        view.update_sc_info(&tx, &Block::default(), 7).unwrap();
        view.flush().unwrap();

        view.revert_tx_outputs(&tx, 7).unwrap();
        assert!(view.is_erased(&sc_id));
        assert!(!view.holds(&sc_id));

        // Re-creating the same id in the same view clears the erasure.
        view.update_sc_info(&creation_tx(sc_id, 20), &Block::default(), 9)
            .unwrap();
        assert!(!view.is_erased(&sc_id));
        assert!(view.sidechain_exists(&sc_id));
    }

    #[test]
    fn test_reverting_unflushed_creation_does_not_erase() {
        let mgr = stub_manager();
        let sc_id = Hash::from_hex("b987").unwrap();
        let tx = creation_tx(sc_id, 10);

        let mut view = CoinsViewCache::new(&mgr);
        view.update_sc_info(&tx, &Block::default(), 3).unwrap();
        view.revert_tx_outputs(&tx, 3).unwrap();

        assert!(!view.is_erased(&sc_id));
        assert!(!view.sidechain_exists(&sc_id));
    }
}
