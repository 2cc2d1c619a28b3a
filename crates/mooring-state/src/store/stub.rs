use std::collections::BTreeMap;

use mooring_core::ScId;

use super::SidechainStore;
use crate::error::StateError;
use crate::info::SidechainInfo;

/// A store that persists nothing.
///
/// Every operation succeeds; `load_all` always yields an empty map.
/// Used by tests and by nodes running without sidechain persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubStore;

impl StubStore {
    pub fn new() -> Self {
        StubStore
    }
}

impl SidechainStore for StubStore {
    fn load_all(&self) -> Result<BTreeMap<ScId, SidechainInfo>, StateError> {
        Ok(BTreeMap::new())
    }

    fn put(&mut self, _sc_id: &ScId, _info: &SidechainInfo) -> Result<(), StateError> {
        Ok(())
    }

    fn delete(&mut self, _sc_id: &ScId) -> Result<(), StateError> {
        Ok(())
    }

    fn dump(&self) -> Result<String, StateError> {
        Ok(String::new())
    }
}
