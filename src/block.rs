//! Block-level types shared by the consensus routines.
pub mod checkpoints;
pub mod genesis;
pub mod pow;
pub mod target;

pub use bitcoin::blockdata::block::{Block, BlockHeader};
pub use bitcoin::blockdata::transaction::Transaction;
pub use bitcoin::hash_types::BlockHash;

/// Difficulty target of a block.
pub type Target = bitcoin::util::uint::Uint256;

/// Block work.
pub type Work = bitcoin::util::uint::Uint256;

/// Compact difficulty bits (target) of a block.
pub type Bits = u32;

/// Height of a block.
pub type Height = u64;

/// Block timestamp.
pub type BlockTime = u32;

/// Read-only view of an indexed block header, as needed by the difficulty
/// routines. The retarget walk borrows its way back through the chain via
/// [`HeaderView::prev`]; it never copies headers and holds no reference past
/// the call.
///
/// Header timestamps are stored as `u32` seconds and widened to `i64` inside
/// the arithmetic, so views over any chain index are loss-free.
pub trait HeaderView {
    /// Height of this block in the chain it belongs to.
    fn height(&self) -> Height;
    /// Timestamp in the block header.
    fn time(&self) -> BlockTime;
    /// Compact difficulty target in the block header.
    fn bits(&self) -> Bits;
    /// The previous block in the chain, if any.
    fn prev(&self) -> Option<&Self>;
}
