use alloy_primitives::{keccak256, Address, U256};
use serde::{Deserialize, Serialize};

use crate::{csv_entry::CsvEntry, error::MerkleTreeError, utils};

/// Represents the claim information for a wallet.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Wallet that will sign (or be claimed for) on-chain
    pub wallet: Address,
    /// Cumulative unclaimed amount, scaled to 18 decimals
    #[serde(with = "utils::u256_decimal")]
    pub amount: U256,
    /// Wallet's proof of inclusion in the Merkle Tree
    #[serde(with = "utils::hex_hash_vec_opt", default)]
    pub proof: Option<Vec<[u8; 32]>>,
}

impl TreeNode {
    /// Leaf hash: one keccak256 pass over the tightly packed
    /// `wallet (20 bytes) ‖ amount (32-byte big-endian)` buffer.
    ///
    /// This must match `keccak256(abi.encodePacked(account, amount))` in the
    /// distributor contract exactly. In particular the packed buffer is
    /// hashed once; hashing the resulting digest a second time produces a
    /// tree the contract will never accept.
    pub fn hash(&self) -> [u8; 32] {
        let mut packed = [0u8; 52];
        packed[..20].copy_from_slice(self.wallet.as_slice());
        packed[20..].copy_from_slice(&self.amount.to_be_bytes::<32>());
        keccak256(packed).0
    }

    /// Return amount for this wallet
    pub fn amount(&self) -> U256 {
        self.amount
    }
}

impl TryFrom<CsvEntry> for TreeNode {
    type Error = MerkleTreeError;

    fn try_from(entry: CsvEntry) -> Result<Self, Self::Error> {
        let wallet = entry
            .wallet
            .trim()
            .parse::<Address>()
            .map_err(|e| MerkleTreeError::MerkleValidationError(format!(
                "invalid wallet address {:?}: {e}",
                entry.wallet
            )))?;
        Ok(Self {
            wallet,
            amount: utils::parse_token_amount(&entry.amount)?,
            proof: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_tree_node() {
        let tree_node = TreeNode {
            wallet: Address::ZERO,
            amount: U256::from(10).pow(U256::from(21)),
            proof: Some(vec![[7u8; 32]]),
        };
        let serialized = serde_json::to_string(&tree_node).unwrap();
        let deserialized: TreeNode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(tree_node, deserialized);
        // amounts travel as decimal strings
        assert!(serialized.contains("\"1000000000000000000000\""));
    }

    #[test]
    fn test_leaf_hash_known_vector() {
        // 1000 tokens at 18 decimals for a fixed mainnet-format address.
        let node = TreeNode {
            wallet: "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307"
                .parse()
                .unwrap(),
            amount: U256::from(10).pow(U256::from(21)),
            proof: None,
        };
        let expected =
            utils::decode_hash("0x2407ed8a6a5323af8f4b362f015728f53b8a28d9c1158929385484eac625b3dc")
                .unwrap();
        assert_eq!(node.hash(), expected);
    }

    #[test]
    fn test_leaf_hash_is_not_double_hashed() {
        // Regression guard: an earlier generator hashed the packed encoding
        // and then hashed that digest again, silently producing roots the
        // on-chain verifier rejected.
        let node = TreeNode {
            wallet: "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307"
                .parse()
                .unwrap(),
            amount: U256::from(10).pow(U256::from(21)),
            proof: None,
        };
        let single = node.hash();
        let double = keccak256(single).0;
        let double_expected =
            utils::decode_hash("0xe5b72a4de35ac1a80f9c5e4b41f2ba5b6f1e18b267f5edbea84c81a9971acacc")
                .unwrap();
        assert_eq!(double, double_expected);
        assert_ne!(single, double);
    }

    #[test]
    fn test_leaf_hash_is_deterministic() {
        let node = TreeNode {
            wallet: Address::repeat_byte(0x11),
            amount: U256::from(5),
            proof: None,
        };
        assert_eq!(node.hash(), node.hash());
    }

    #[test]
    fn test_try_from_csv_entry() {
        let entry = CsvEntry {
            wallet: " 0x41347A026E28f532Ca464bd4FfFa451bF1aA5307 ".to_string(),
            amount: "1000".to_string(),
        };
        let node = TreeNode::try_from(entry).unwrap();
        assert_eq!(node.amount, U256::from(10).pow(U256::from(21)));

        let bad = CsvEntry {
            wallet: "not-an-address".to_string(),
            amount: "1".to_string(),
        };
        assert!(TreeNode::try_from(bad).is_err());
    }
}
