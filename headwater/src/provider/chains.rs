use crate::core::ChainId;

/// Human-readable chain name, used only for log and metric labels.
pub fn chain_display_name(chain_id: ChainId) -> String {
    match chain_id {
        1 => "ethereum-mainnet".to_string(),
        5 => "goerli".to_string(),
        10 => "optimism".to_string(),
        56 => "bnb-smart-chain".to_string(),
        100 => "gnosis".to_string(),
        137 => "polygon".to_string(),
        8453 => "base".to_string(),
        42161 => "arbitrum-one".to_string(),
        43114 => "avalanche".to_string(),
        11155111 => "sepolia".to_string(),
        _ => format!("chain-{chain_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_chains_get_a_synthetic_name() {
        assert_eq!(chain_display_name(1), "ethereum-mainnet");
        assert_eq!(chain_display_name(999_999), "chain-999999");
    }
}
