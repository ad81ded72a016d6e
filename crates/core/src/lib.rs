//! Chain primitives.
//!
//! The types a consensus round is made of: fixed-width hashes, witnesses,
//! transactions, block headers and the extensible payload envelope all
//! dBFT messages travel in.

pub mod block;
pub mod error;
pub mod extensible;
pub mod transaction;
pub mod uint160;
pub mod uint256;
pub mod witness;

pub use block::{Block, Header, TrimmedBlock, BLOCK_VERSION};
pub use error::{CoreError, CoreResult};
pub use extensible::ExtensiblePayload;
pub use transaction::Transaction;
pub use uint160::UInt160;
pub use uint256::UInt256;
pub use witness::Witness;
