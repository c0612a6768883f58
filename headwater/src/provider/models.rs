use crate::core::{ChainId, NewBlockHeader};

pub use alloy_primitives::B256;
pub use alloy_rpc_types::{Block, BlockId, BlockNumberOrTag, BlockTransactionsKind, Header};

pub trait BlockExt {
    /// Convert an RPC block into an insertable header record.
    ///
    /// Returns `None` when the node served a partial header (no number or no
    /// hash), which callers surface as a protocol violation.
    fn to_new_header(&self, chain_id: ChainId) -> Option<NewBlockHeader>;
}

impl BlockExt for Block {
    fn to_new_header(&self, chain_id: ChainId) -> Option<NewBlockHeader> {
        let number = self.header.number?;
        let hash = self.header.hash?;
        let timestamp = u32::try_from(self.header.timestamp).ok()?;

        Some(NewBlockHeader {
            chain_id,
            number,
            hash: format!("{hash:#x}"),
            parent_hash: format!("{:#x}", self.header.parent_hash),
            timestamp,
        })
    }
}
