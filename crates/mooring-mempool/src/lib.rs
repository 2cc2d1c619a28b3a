//! Mooring Mempool - Pending transaction pool
//!
//! A membership container for transactions awaiting inclusion in a
//! block. The sidechain admission gate scans it for conflicting
//! sidechain creations.

pub mod pool;

pub use pool::{Mempool, MempoolConfig, MempoolError};
