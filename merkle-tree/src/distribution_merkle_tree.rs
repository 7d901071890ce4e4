use std::{
    fs::File,
    io::{BufReader, Write},
    path::PathBuf,
    result,
};

use alloy_primitives::{Address, U256};
use amd_merkle_verify::verify;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    csv_entry::CsvEntry,
    error::{MerkleTreeError, MerkleTreeError::MerkleValidationError},
    merkle_tree::{MerkleTree, ZERO_ROOT},
    tree_node::TreeNode,
    utils::{self, get_max_total_claim},
};

pub type Result<T> = result::Result<T, MerkleTreeError>;

/// Merkle Tree which will be used to distribute AMD tokens to claimants.
/// Contains all the information necessary to verify claims against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionMerkleTree {
    /// The merkle root, which is uploaded on-chain
    #[serde(with = "utils::hex_hash")]
    pub merkle_root: [u8; 32],
    pub max_num_nodes: u64,
    #[serde(with = "utils::u256_decimal")]
    pub max_total_claim: U256,
    pub tree_nodes: Vec<TreeNode>,
}

impl DistributionMerkleTree {
    pub fn new(mut tree_nodes: Vec<TreeNode>) -> Result<Self> {
        // Leaves are ordered by wallet bytes so a fixed input set always
        // yields the same root and the same proofs.
        tree_nodes.sort_by(|a, b| a.wallet.cmp(&b.wallet));

        // Two nodes with the same wallet means two user records share an
        // address; that is a storage inconsistency to repair, not something
        // to paper over by combining amounts.
        for pair in tree_nodes.windows(2) {
            if pair[0].wallet == pair[1].wallet {
                return Err(MerkleValidationError(format!(
                    "duplicate wallet {} in tree nodes",
                    pair[0].wallet
                )));
            }
        }

        if tree_nodes.is_empty() {
            // No outstanding allocations. The zero root is a valid published
            // state under which nothing is claimable.
            return Ok(Self {
                merkle_root: ZERO_ROOT,
                max_num_nodes: 0,
                max_total_claim: U256::ZERO,
                tree_nodes,
            });
        }

        let hashed_nodes = tree_nodes
            .iter()
            .map(|claim_info| claim_info.hash())
            .collect::<Vec<_>>();

        let tree = MerkleTree::new(&hashed_nodes[..]);

        for (i, tree_node) in tree_nodes.iter_mut().enumerate() {
            tree_node.proof = Some(tree.proof(i).ok_or(MerkleTreeError::MerkleRootError)?);
        }

        let max_total_claim = get_max_total_claim(tree_nodes.as_ref())?;
        let distribution_tree = DistributionMerkleTree {
            merkle_root: tree.root(),
            max_num_nodes: tree_nodes.len() as u64,
            max_total_claim,
            tree_nodes,
        };

        info!(
            "created merkle tree with {} nodes and max total claim of {}",
            distribution_tree.max_num_nodes, distribution_tree.max_total_claim
        );
        distribution_tree.validate()?;
        Ok(distribution_tree)
    }

    pub fn new_from_entries(entries: Vec<CsvEntry>) -> Result<Self> {
        let tree_nodes = entries
            .into_iter()
            .map(TreeNode::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(tree_nodes)
    }

    /// Load a merkle tree from a csv path
    pub fn new_from_csv(path: &PathBuf) -> Result<Self> {
        let csv_entries = CsvEntry::new_from_file(path)?;
        Self::new_from_entries(csv_entries)
    }

    /// Load a serialized merkle tree from file path
    pub fn new_from_file(path: &PathBuf) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let tree: DistributionMerkleTree = serde_json::from_reader(reader)?;

        Ok(tree)
    }

    /// Write a merkle tree to a filepath
    pub fn write_to_file(&self, path: &PathBuf) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self)?;
        let mut file = File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn get_node(&self, wallet: &Address) -> Option<&TreeNode> {
        self.tree_nodes.iter().find(|node| node.wallet == *wallet)
    }

    fn validate(&self) -> Result<()> {
        // The Merkle tree can be at most height 32, implying a max node count of 2^32 - 1
        if self.max_num_nodes > 2u64.pow(32) - 1 {
            return Err(MerkleValidationError(format!(
                "Max num nodes {} is greater than 2^32 - 1",
                self.max_num_nodes
            )));
        }

        // validate that the length is equal to the max_num_nodes
        if self.tree_nodes.len() != self.max_num_nodes as usize {
            return Err(MerkleValidationError(format!(
                "Tree nodes length {} does not match max_num_nodes {}",
                self.tree_nodes.len(),
                self.max_num_nodes
            )));
        }

        // validate that sum is equal to max_total_claim
        let sum = get_max_total_claim(&self.tree_nodes)?;
        if sum != self.max_total_claim {
            return Err(MerkleValidationError(format!(
                "Tree nodes sum {} does not match max_total_claim {}",
                sum, self.max_total_claim
            )));
        }

        if self.verify_proof().is_err() {
            return Err(MerkleValidationError(
                "Merkle root is invalid given nodes".to_string(),
            ));
        }

        Ok(())
    }

    /// verify that every stored proof still reduces to the root
    pub fn verify_proof(&self) -> Result<()> {
        let root = self.merkle_root;

        for node in self.tree_nodes.iter() {
            let proof = node
                .proof
                .clone()
                .ok_or_else(|| MerkleValidationError("node is missing a proof".to_string()))?;
            if !verify(proof, root, node.hash()) {
                return Err(MerkleValidationError("invalid merkle proof".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::utils::decode_hash;

    fn node(wallet: Address, tokens: u64) -> TreeNode {
        TreeNode {
            wallet,
            amount: U256::from(tokens) * U256::from(10).pow(U256::from(18)),
            proof: None,
        }
    }

    fn rand_wallet() -> Address {
        Address::from(rand::random::<[u8; 20]>())
    }

    #[test]
    fn test_verify_new_merkle_tree() {
        let tree_nodes = vec![node(Address::ZERO, 2)];
        let merkle_tree = DistributionMerkleTree::new(tree_nodes).unwrap();
        assert!(merkle_tree.verify_proof().is_ok(), "verify failed");
    }

    #[test]
    fn test_empty_tree_is_zero_root_with_no_proofs() {
        let tree = DistributionMerkleTree::new(vec![]).unwrap();
        assert_eq!(tree.merkle_root, ZERO_ROOT);
        assert_eq!(tree.max_num_nodes, 0);
        assert!(tree.tree_nodes.is_empty());
    }

    #[test]
    fn test_three_node_golden_root() {
        // Pins the sorted-pair combination and the odd-node promotion rule:
        // changing either moves this root.
        let tree = DistributionMerkleTree::new(vec![
            node(Address::repeat_byte(0x11), 1),
            node(Address::repeat_byte(0x22), 2),
            node(Address::repeat_byte(0x33), 3),
        ])
        .unwrap();
        let expected =
            decode_hash("0xccd92ae3e8d6aa64ed3242863d5d69ae824314bac905360c1f845f16054250d8")
                .unwrap();
        assert_eq!(tree.merkle_root, expected);
    }

    #[test]
    fn test_root_is_independent_of_input_order() {
        let a = node(Address::repeat_byte(0x11), 1);
        let b = node(Address::repeat_byte(0x22), 2);
        let c = node(Address::repeat_byte(0x33), 3);
        let forward = DistributionMerkleTree::new(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let reversed = DistributionMerkleTree::new(vec![c, b, a]).unwrap();
        assert_eq!(forward.merkle_root, reversed.merkle_root);
    }

    #[test]
    fn test_duplicate_wallets_are_rejected() {
        let wallet = rand_wallet();
        let result = DistributionMerkleTree::new(vec![node(wallet, 1), node(wallet, 2)]);
        assert!(matches!(result, Err(MerkleValidationError(_))));
    }

    #[test]
    fn test_large_random_tree_verifies() {
        let tree_nodes: Vec<TreeNode> = (0..100)
            .map(|_| node(rand_wallet(), rand::random::<u64>() % 1000 + 1))
            .collect();
        let merkle_tree = DistributionMerkleTree::new(tree_nodes).unwrap();
        assert_eq!(merkle_tree.max_num_nodes, 100);
        assert!(merkle_tree.verify_proof().is_ok());
    }

    #[test]
    fn test_write_and_read_file_round_trip() {
        let tree_nodes = vec![
            node(rand_wallet(), 100),
            node(rand_wallet(), 200),
            node(rand_wallet(), 300),
        ];
        let merkle_tree = DistributionMerkleTree::new(tree_nodes).unwrap();

        let dir = std::env::temp_dir().join("amd_distribution_tree_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = PathBuf::from(dir.join("merkle_tree.json"));
        merkle_tree.write_to_file(&path).unwrap();

        let read_back = DistributionMerkleTree::new_from_file(&path).unwrap();
        assert_eq!(read_back.tree_nodes.len(), 3);
        assert_eq!(read_back.merkle_root, merkle_tree.merkle_root);
        assert!(read_back.verify_proof().is_ok());
    }

    #[test]
    fn test_get_node() {
        let wallet = rand_wallet();
        let tree =
            DistributionMerkleTree::new(vec![node(wallet, 5), node(rand_wallet(), 7)]).unwrap();
        assert_eq!(tree.get_node(&wallet).unwrap().wallet, wallet);
        assert!(tree.get_node(&rand_wallet()).is_none());
    }
}
