use serde::Serialize;

/// Identifies an EVM network (1 = mainnet, 137 = polygon, ...).
pub type ChainId = u32;

/// A block header as stored in the database.
///
/// `id` is a surrogate key and never leaves the process; the API serializes
/// headers through [`BlockHeaderDto`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub id: i64,
    pub chain_id: ChainId,
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u32,
}

/// A block header about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlockHeader {
    pub chain_id: ChainId,
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u32,
}

/// Wire representation of a block header.
///
/// `number` and `timestamp` are decimal strings: consumers assume no
/// precision loss, and 64-bit heights do not survive a float round-trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeaderDto {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: String,
}

impl From<BlockHeader> for BlockHeaderDto {
    fn from(header: BlockHeader) -> Self {
        Self {
            number: header.number.to_string(),
            hash: header.hash,
            parent_hash: header.parent_hash,
            timestamp: header.timestamp.to_string(),
        }
    }
}

impl std::fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.chain_id, self.number, self.hash)
    }
}

impl std::fmt::Display for NewBlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.chain_id, self.number, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dto_uses_decimal_strings_and_camel_case() {
        let header = BlockHeader {
            id: 7,
            chain_id: 1,
            number: 18_446_744_073_709_551_615,
            hash: "0xabc".to_string(),
            parent_hash: "0xdef".to_string(),
            timestamp: 1_700_000_000,
        };

        let value = serde_json::to_value(BlockHeaderDto::from(header)).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(object["number"], "18446744073709551615");
        assert_eq!(object["hash"], "0xabc");
        assert_eq!(object["parentHash"], "0xdef");
        assert_eq!(object["timestamp"], "1700000000");
    }
}
