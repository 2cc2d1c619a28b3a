//! Mooring State - Sidechain state engine
//!
//! Tracks the existence, balances, and maturation timelines of
//! registered sidechains as main-chain blocks are connected and
//! disconnected. Three layers:
//!
//! - [`store`]: a narrow persistence interface with a durable and a
//!   stub variant.
//! - [`SidechainManager`]: the committed, process-wide view, mirroring
//!   the store in memory and serving read queries and validators.
//! - [`CoinsViewCache`]: a per-block transactional overlay that stages
//!   creations, forward transfers, maturation, and their reversals, and
//!   commits them atomically with [`CoinsViewCache::flush`].

pub mod codec;
pub mod error;
pub mod info;
pub mod manager;
pub mod store;
pub mod undo;
pub mod view;

pub use error::StateError;
pub use info::SidechainInfo;
pub use manager::{PersistencePolicy, SidechainManager};
pub use store::{DiskStore, SidechainStore, StubStore};
pub use undo::BlockUndo;
pub use view::CoinsViewCache;
