use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mooring_core::{Hash, ScId};
use tracing::{debug, info};

use super::{sc_key, SidechainStore, SC_KEY_PREFIX};
use crate::codec;
use crate::error::StateError;
use crate::info::SidechainInfo;

fn io_err(e: io::Error) -> StateError {
    StateError::Storage(e.to_string())
}

/// Durable store backed by a single snapshot file in the codec's
/// compact-size framing.
///
/// The full key space is mirrored in memory and rewritten through a
/// temp-file rename on every mutation, which gives `put` and `delete`
/// single-key crash safety: a reader sees either the old snapshot or
/// the new one.
#[derive(Debug)]
pub struct DiskStore {
    path: PathBuf,
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl DiskStore {
    /// Open the store at `path`. `cache_size` is a backend hint only;
    /// `wipe` discards any on-disk contents.
    pub fn open<P: Into<PathBuf>>(
        path: P,
        cache_size: usize,
        wipe: bool,
    ) -> Result<Self, StateError> {
        let path = path.into();
        info!(
            "Opening sidechain store at {} (cache hint {} bytes, wipe {})",
            path.display(),
            cache_size,
            wipe
        );

        let data = if !wipe && path.exists() {
            let bytes = fs::read(&path).map_err(io_err)?;
            if bytes.is_empty() {
                BTreeMap::new()
            } else {
                codec::decode_snapshot(&bytes)?
            }
        } else {
            BTreeMap::new()
        };

        let store = DiskStore { path, data };
        if wipe {
            store.persist()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the snapshot through a temp file, so a crash mid-write
    /// leaves the previous snapshot intact.
    fn persist(&self) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("new");
        fs::write(&tmp, codec::encode_snapshot(&self.data)?).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl SidechainStore for DiskStore {
    fn load_all(&self) -> Result<BTreeMap<ScId, SidechainInfo>, StateError> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.data {
            if key.first() != Some(&SC_KEY_PREFIX) {
                continue;
            }
            let sc_id = Hash::from_slice(&key[1..])
                .ok_or_else(|| StateError::Deserialization("malformed store key".into()))?;
            out.insert(sc_id, codec::decode_info(value)?);
        }
        debug!("Loaded {} sidechain records from disk", out.len());
        Ok(out)
    }

    fn put(&mut self, sc_id: &ScId, info: &SidechainInfo) -> Result<(), StateError> {
        let value = codec::encode_info(info)?;
        self.data.insert(sc_key(sc_id).to_vec(), value);
        self.persist()?;
        debug!("Persisted sidechain {}", sc_id);
        Ok(())
    }

    fn delete(&mut self, sc_id: &ScId) -> Result<(), StateError> {
        self.data.remove(sc_key(sc_id).as_slice());
        self.persist()?;
        debug!("Deleted sidechain {} from disk", sc_id);
        Ok(())
    }

    fn dump(&self) -> Result<String, StateError> {
        let mut out = format!("sidechain store at {}\n", self.path.display());
        for (sc_id, info) in self.load_all()? {
            out.push_str(&format!("sidechain {sc_id}\n{info}"));
        }
        Ok(out)
    }
}
