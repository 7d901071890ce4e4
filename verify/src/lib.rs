use alloy_primitives::keccak256;

/// Direct port of https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v3.4.0/contracts/cryptography/MerkleProof.sol
/// Returns true if a `leaf` can be proved to be a part of a Merkle tree
/// defined by `root`. For this, a `proof` must be provided, containing
/// sibling hashes on the branch from the leaf to the root of the tree. Each
/// pair of leaves and each pair of pre-images are assumed to be sorted, so
/// the verifier never needs to know whether a sibling was a left or right
/// child.
pub fn verify(proof: Vec<[u8; 32]>, root: [u8; 32], leaf: [u8; 32]) -> bool {
    let mut computed_hash = leaf;
    for proof_element in proof.into_iter() {
        let mut packed = [0u8; 64];
        if computed_hash <= proof_element {
            // Hash(current computed hash + current element of the proof)
            packed[..32].copy_from_slice(&computed_hash);
            packed[32..].copy_from_slice(&proof_element);
        } else {
            // Hash(current element of the proof + current computed hash)
            packed[..32].copy_from_slice(&proof_element);
            packed[32..].copy_from_slice(&computed_hash);
        }
        computed_hash = keccak256(packed).0;
    }
    // Check if the computed hash (root) is equal to the provided root
    computed_hash == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combine(a: [u8; 32], b: [u8; 32]) -> [u8; 32] {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut packed = [0u8; 64];
        packed[..32].copy_from_slice(&lo);
        packed[32..].copy_from_slice(&hi);
        keccak256(packed).0
    }

    #[test]
    fn test_verify_single_level() {
        let leaf = keccak256(b"leaf").0;
        let sibling = keccak256(b"sibling").0;
        let root = combine(leaf, sibling);
        assert!(verify(vec![sibling], root, leaf));
        assert!(!verify(vec![sibling], root, sibling));
    }

    #[test]
    fn test_verify_empty_proof_is_leaf_equality() {
        let leaf = keccak256(b"only").0;
        assert!(verify(vec![], leaf, leaf));
        assert!(!verify(vec![], [0u8; 32], leaf));
    }

    #[test]
    fn test_verify_rejects_reordered_proof() {
        let a = keccak256(b"a").0;
        let b = keccak256(b"b").0;
        let c = keccak256(b"c").0;
        let ab = combine(a, b);
        let root = combine(ab, c);
        assert!(verify(vec![b, c], root, a));
        assert!(!verify(vec![c, b], root, a));
    }
}
