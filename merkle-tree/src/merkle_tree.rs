use alloy_primitives::keccak256;

/// Root of the empty tree. Publishing this value disables all claims, which
/// is the defined behavior when no allocations are outstanding.
pub const ZERO_ROOT: [u8; 32] = [0u8; 32];

/// Combines two sibling hashes by hashing them in sorted order, so proof
/// verification never needs to track left/right position. Must stay
/// byte-identical to the on-chain verifier and to `amd-merkle-verify`.
pub fn combine_hashes(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(lo);
    packed[32..].copy_from_slice(hi);
    keccak256(packed).0
}

/// Binary Merkle tree over pre-hashed leaves with the sorted-pair rule.
///
/// At levels of odd cardinality the trailing node is promoted unchanged to
/// the next level. The same rule drives both root computation and proof
/// construction; a promoted node contributes no proof element at that level,
/// so proofs can be shorter than the tree depth.
pub struct MerkleTree {
    /// levels[0] holds the leaves, the last level holds the root alone.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    pub fn new(leaves: &[[u8; 32]]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => next.push(combine_hashes(left, right)),
                    [promoted] => next.push(*promoted),
                    _ => unreachable!(),
                }
            }
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> [u8; 32] {
        self.levels
            .last()
            .and_then(|level| level.first().copied())
            .unwrap_or(ZERO_ROOT)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    pub fn proof(&self, index: usize) -> Option<Vec<[u8; 32]>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut proof = Vec::new();
        let mut position = index;
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let sibling = position ^ 1;
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            // A node with no sibling was promoted; its parent sits at the
            // same halved index.
            position /= 2;
        }
        Some(proof)
    }
}
