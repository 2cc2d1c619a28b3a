pub mod amount;
pub mod block;
pub mod transaction;
pub mod validation;

pub use amount::{money_range, Amount, COIN, MAX_MONEY};
pub use block::{Block, BlockHeader};
pub use transaction::{PayloadKind, ScOutput, Transaction};
pub use validation::{ValidationState, REJECT_INVALID};
