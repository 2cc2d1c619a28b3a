pub mod hash;

pub use hash::{hash_blake3, hash_value, merkle_root, Hash, ScId};
