//! Mooring Core - Core types and hashing
//!
//! This crate provides the foundational types shared by the mooring
//! sidechain state engine: hashes and identifiers, monetary amounts,
//! transactions carrying sidechain outputs, blocks, chain parameters,
//! and validation-state reporting.

pub mod crypto;
pub mod error;
pub mod params;
pub mod types;

pub use crypto::{hash_blake3, hash_value, merkle_root, Hash, ScId};
pub use error::CoreError;
pub use params::ChainParams;
pub use types::*;
