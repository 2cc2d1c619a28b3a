use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use mooring_core::{
    money_range, Amount, ChainParams, PayloadKind, ScId, Transaction, ValidationState,
    REJECT_INVALID,
};
use mooring_mempool::Mempool;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::StateError;
use crate::info::SidechainInfo;
use crate::store::{DiskStore, SidechainStore, StubStore};
use crate::view::CoinsViewCache;

/// Which persistence backend the manager runs on.
#[derive(Debug, Clone)]
pub enum PersistencePolicy {
    /// No durable storage; everything is lost on reset. For tests.
    Stub,
    /// Durable store rooted at the given path.
    Persist(PathBuf),
}

struct ManagerInner {
    store: Option<Box<dyn SidechainStore>>,
    sidechains: BTreeMap<ScId, SidechainInfo>,
}

/// The process-wide authority on committed sidechain state.
///
/// Owns the in-memory mirror of the persistent store and serves read
/// queries and validators. Mutations arrive only through a
/// [`CoinsViewCache`] flush. One reader-writer lock guards the map and
/// the store together; queries take it shared, lifecycle operations and
/// flushes take it exclusive.
pub struct SidechainManager {
    params: ChainParams,
    inner: RwLock<ManagerInner>,
}

impl SidechainManager {
    /// Create a manager with no persistence attached yet. Call
    /// [`init_persistence`](Self::init_persistence) exactly once before use.
    pub fn new(params: ChainParams) -> Self {
        SidechainManager {
            params,
            inner: RwLock::new(ManagerInner {
                store: None,
                sidechains: BTreeMap::new(),
            }),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Attach the persistence backend and load every committed record.
    ///
    /// May be called once per manager; a second call fails and leaves
    /// the state unchanged.
    pub fn init_persistence(
        &self,
        cache_size: usize,
        wipe: bool,
        policy: PersistencePolicy,
    ) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        if inner.store.is_some() {
            warn!("Rejecting second sidechain persistence initialization");
            return Err(StateError::AlreadyInitialized);
        }

        let store: Box<dyn SidechainStore> = match policy {
            PersistencePolicy::Stub => Box::new(StubStore::new()),
            PersistencePolicy::Persist(path) => Box::new(DiskStore::open(path, cache_size, wipe)?),
        };

        inner.sidechains = store.load_all()?;
        info!(
            "Sidechain manager initialized with {} committed sidechains",
            inner.sidechains.len()
        );
        inner.store = Some(store);
        Ok(())
    }

    /// Tear down persistence and clear the committed map. For process
    /// shutdown and test isolation; `init_persistence` may be called
    /// again afterwards.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.store = None;
        inner.sidechains.clear();
        info!("Sidechain manager reset");
    }

    /// Whether a sidechain is visible: through `view`'s overlay when
    /// supplied, otherwise in the committed map.
    pub fn sidechain_exists(&self, sc_id: &ScId, view: Option<&CoinsViewCache<'_>>) -> bool {
        if let Some(view) = view {
            if view.is_erased(sc_id) {
                return false;
            }
            if view.holds(sc_id) {
                return true;
            }
        }
        self.inner.read().sidechains.contains_key(sc_id)
    }

    /// Copy out the committed record for `sc_id`.
    pub fn get_sc_info(&self, sc_id: &ScId) -> Option<SidechainInfo> {
        self.inner.read().sidechains.get(sc_id).cloned()
    }

    /// Copy of the full committed map.
    pub fn get_sc_info_map(&self) -> BTreeMap<ScId, SidechainInfo> {
        self.inner.read().sidechains.clone()
    }

    /// The set of all committed sidechain ids.
    pub fn get_sc_id_set(&self) -> BTreeSet<ScId> {
        self.inner.read().sidechains.keys().copied().collect()
    }

    /// Committed balance of `sc_id`, or `None` if it does not exist.
    pub fn get_sc_balance(&self, sc_id: &ScId) -> Option<Amount> {
        self.inner.read().sidechains.get(sc_id).map(|info| info.balance)
    }

    /// Formatted listing of the committed map, for diagnostics.
    pub fn dump_info(&self) -> String {
        let inner = self.inner.read();
        let mut out = format!("{} committed sidechains\n", inner.sidechains.len());
        for (sc_id, info) in &inner.sidechains {
            out.push_str(&format!("sidechain {sc_id}\n{info}"));
        }
        out
    }

    /// Static checks needing no sidechain state.
    ///
    /// A transaction without sidechain outputs is trivially valid here,
    /// whatever its payload looks like. With sidechain outputs, the
    /// payload must be transparent, every forward must carry a positive
    /// in-range amount, the cumulative forwarded sum must stay in
    /// range, and every declared sidechain must be funded by same-tx
    /// forwards.
    pub fn check_tx_semantic_validity(tx: &Transaction, state: &mut ValidationState) -> bool {
        if !tx.has_sc_outputs() {
            return true;
        }

        if tx.payload == PayloadKind::Shielded {
            return state.invalidate(
                REJECT_INVALID,
                "sidechain outputs in a shielded transaction",
            );
        }

        let mut cumulative: Amount = 0;
        for (sc_id, amount) in tx.forwards() {
            if amount <= 0 || !money_range(amount) {
                return state.invalidate(
                    REJECT_INVALID,
                    format!("forward transfer to {sc_id} with amount out of range"),
                );
            }
            cumulative = match cumulative.checked_add(amount) {
                Some(total) if money_range(total) => total,
                _ => {
                    return state.invalidate(
                        REJECT_INVALID,
                        "cumulative forward transfer amount out of range",
                    )
                }
            };
        }

        Self::check_sc_creation(tx, state)
    }

    /// Creation-output rules: every declared sidechain needs same-tx
    /// forward funding with an in-range positive sum.
    fn check_sc_creation(tx: &Transaction, state: &mut ValidationState) -> bool {
        for (sc_id, _) in tx.creations() {
            if !tx.any_forward_to(sc_id) {
                return state.invalidate(
                    REJECT_INVALID,
                    format!("sidechain creation {sc_id} without a forward transfer"),
                );
            }
            let mut funding: Amount = 0;
            for (target, amount) in tx.forwards() {
                if target == sc_id {
                    funding = match funding.checked_add(amount) {
                        Some(total) => total,
                        None => {
                            return state.invalidate(
                                REJECT_INVALID,
                                format!("creation funding for {sc_id} out of range"),
                            )
                        }
                    };
                }
            }
            if funding <= 0 || !money_range(funding) {
                return state.invalidate(
                    REJECT_INVALID,
                    format!("sidechain creation {sc_id} lacks positive forward funding"),
                );
            }
        }
        true
    }

    /// Whether `tx` can apply on top of the visible state: its
    /// creations must be new ids and its forwards must target
    /// sidechains that exist (or that `tx` itself creates). Nothing is
    /// mutated; the first violation wins.
    pub fn is_tx_applicable_to_state(
        &self,
        tx: &Transaction,
        view: Option<&CoinsViewCache<'_>>,
    ) -> bool {
        for (sc_id, _) in tx.creations() {
            if self.sidechain_exists(sc_id, view) {
                warn!("Invalid tx: sidechain {} already created", sc_id);
                return false;
            }
        }
        for (sc_id, _) in tx.forwards() {
            if !tx.creates_sidechain(sc_id) && !self.sidechain_exists(sc_id, view) {
                warn!("Invalid tx: forward transfer to missing sidechain {}", sc_id);
                return false;
            }
        }
        true
    }

    /// Mempool admission gate: reject a transaction whose sidechain
    /// creations collide with a transaction already pending in `pool`.
    pub fn is_tx_allowed_in_mempool(
        &self,
        pool: &Mempool,
        tx: &Transaction,
        state: &mut ValidationState,
    ) -> bool {
        if Self::has_sc_creation_conflicts_in_mempool(pool, tx) {
            return state.invalidate(
                REJECT_INVALID,
                "transaction creates a sidechain already created in the mempool",
            );
        }
        true
    }

    /// Whether any pending transaction creates one of `tx`'s creation ids.
    fn has_sc_creation_conflicts_in_mempool(pool: &Mempool, tx: &Transaction) -> bool {
        for pool_tx in pool.transactions() {
            for (sc_id, _) in tx.creations() {
                if pool_tx.creates_sidechain(sc_id) {
                    debug!("Mempool already creates sidechain {}", sc_id);
                    return true;
                }
            }
        }
        false
    }

    /// Commit one view's overlay: erasures first, then dirty records,
    /// each mirrored to the store. Holds the write lock for the whole
    /// commit so readers see either the old or the new state.
    pub(crate) fn apply_flush(
        &self,
        erase: &BTreeSet<ScId>,
        cache: &BTreeMap<ScId, SidechainInfo>,
        dirty: &BTreeSet<ScId>,
    ) -> Result<(), StateError> {
        let mut guard = self.inner.write();
        let ManagerInner { store, sidechains } = &mut *guard;
        let store = store.as_mut().ok_or(StateError::NotInitialized)?;

        for sc_id in erase {
            sidechains.remove(sc_id);
            store.delete(sc_id)?;
            debug!("Erased sidechain {}", sc_id);
        }
        for sc_id in dirty {
            if let Some(info) = cache.get(sc_id) {
                sidechains.insert(*sc_id, info.clone());
                store.put(sc_id, info)?;
                debug!("Committed sidechain {}", sc_id);
            }
        }

        info!(
            "Flushed sidechain view: {} erased, {} written",
            erase.len(),
            dirty.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooring_core::{Hash, ScOutput};

    fn stub_manager() -> SidechainManager {
        let mgr = SidechainManager::new(ChainParams::default());
        mgr.init_persistence(0, false, PersistencePolicy::Stub)
            .unwrap();
        mgr
    }

    fn creation_tx(sc_id: &str, amount: Amount) -> Transaction {
        let sc_id = Hash::from_hex(sc_id).unwrap();
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
    fn test_double_initialization_is_forbidden() {
        let mgr = stub_manager();
        let res = mgr.init_persistence(0, false, PersistencePolicy::Stub);
        assert!(matches!(res, Err(StateError::AlreadyInitialized)));
    }

    #[test]
    fn test_reset_allows_reinitialization() {
        let mgr = stub_manager();
        mgr.reset();
        assert!(mgr
            .init_persistence(0, false, PersistencePolicy::Stub)
            .is_ok());
    }

    #[test]
    fn test_queries_on_empty_manager() {
        let mgr = stub_manager();
        let sc_id = Hash::from_hex("1492").unwrap();

        assert!(!mgr.sidechain_exists(&sc_id, None));
        assert!(mgr.get_sc_info(&sc_id).is_none());
        assert!(mgr.get_sc_balance(&sc_id).is_none());
        assert!(mgr.get_sc_id_set().is_empty());
    }

    #[test]
    fn test_semantic_validity_is_pure() {
        let tx = creation_tx("1492", 0);

        let mut first = ValidationState::new();
        let mut second = ValidationState::new();
        assert!(!SidechainManager::check_tx_semantic_validity(&tx, &mut first));
        assert!(!SidechainManager::check_tx_semantic_validity(&tx, &mut second));
        assert_eq!(first.reject_code(), second.reject_code());
        assert_eq!(first.reject_reason(), second.reject_reason());
    }
}
