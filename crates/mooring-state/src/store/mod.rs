pub mod disk;
pub mod stub;

use std::collections::BTreeMap;

use mooring_core::ScId;

use crate::error::StateError;
use crate::info::SidechainInfo;

/// Prefix byte of the sidechain keyspace in the backing store.
pub(crate) const SC_KEY_PREFIX: u8 = b's';

/// Store key for one sidechain: prefix byte followed by the raw id.
pub(crate) fn sc_key(sc_id: &ScId) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = SC_KEY_PREFIX;
    key[1..].copy_from_slice(sc_id.as_bytes());
    key
}

/// Narrow persistence interface for sidechain records.
///
/// The engine owns exactly one store and never names the concrete
/// backend; any failure is a hard failure with no partial-success
/// contract.
pub trait SidechainStore: Send + Sync {
    /// Scan every record in the sidechain keyspace into a fresh map.
    fn load_all(&self) -> Result<BTreeMap<ScId, SidechainInfo>, StateError>;

    /// Write one record.
    fn put(&mut self, sc_id: &ScId, info: &SidechainInfo) -> Result<(), StateError>;

    /// Remove one record.
    fn delete(&mut self, sc_id: &ScId) -> Result<(), StateError>;

    /// Human-readable listing of the store contents, for diagnostics.
    fn dump(&self) -> Result<String, StateError>;
}

pub use disk::DiskStore;
pub use stub::StubStore;
