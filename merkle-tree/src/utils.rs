use alloy_primitives::U256;

use crate::{error::MerkleTreeError, tree_node::TreeNode};

/// The AMD token uses the standard 18 decimal places on BSC.
pub const TOKEN_DECIMALS: u32 = 18;

/// Parses a human-readable decimal token amount ("1000", "0.5", "12.25")
/// into a fixed-point integer scaled to [`TOKEN_DECIMALS`].
///
/// More fractional digits than the token carries cannot be represented
/// on-chain and are rejected rather than silently truncated.
pub fn parse_token_amount(raw: &str) -> Result<U256, MerkleTreeError> {
    let trimmed = raw.trim();
    let invalid = || MerkleTreeError::InvalidAmount(raw.to_string());

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if frac_part.len() > TOKEN_DECIMALS as usize {
        return Err(invalid());
    }

    let scale = U256::from(10).pow(U256::from(TOKEN_DECIMALS));
    let int_value = if int_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(int_part, 10).map_err(|_| invalid())?
    };

    let mut frac_padded = frac_part.to_string();
    while frac_padded.len() < TOKEN_DECIMALS as usize {
        frac_padded.push('0');
    }
    let frac_value = if frac_padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_padded, 10).map_err(|_| invalid())?
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(invalid)
}

/// Renders a scaled fixed-point amount back to a human decimal string,
/// trimming trailing fractional zeros. Inverse of [`parse_token_amount`].
pub fn format_token_amount(amount: U256) -> String {
    let scale = U256::from(10).pow(U256::from(TOKEN_DECIMALS));
    let int_part = amount / scale;
    let frac_part = amount % scale;
    if frac_part.is_zero() {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0>width$}", width = TOKEN_DECIMALS as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Given a set of tree nodes, get the max total claim amount.
pub fn get_max_total_claim(nodes: &[TreeNode]) -> Result<U256, MerkleTreeError> {
    nodes
        .iter()
        .try_fold(U256::ZERO, |acc, n| acc.checked_add(n.amount()))
        .ok_or_else(|| {
            MerkleTreeError::MerkleValidationError("total claim amount overflows u256".to_string())
        })
}

/// Encodes a 32-byte hash as a 0x-prefixed hex string, the form persisted in
/// distribution and proof records.
pub fn encode_hash(hash: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Decodes a 0x-prefixed (or bare) hex string into a 32-byte hash.
pub fn decode_hash(raw: &str) -> Result<[u8; 32], MerkleTreeError> {
    let stripped = raw.trim().trim_start_matches("0x");
    let bytes =
        hex::decode(stripped).map_err(|_| MerkleTreeError::InvalidHash(raw.to_string()))?;
    let hash: [u8; 32] = bytes
        .try_into()
        .map_err(|_| MerkleTreeError::InvalidHash(raw.to_string()))?;
    Ok(hash)
}

/// Serde adapter storing a `U256` as a base-10 decimal string, which is how
/// amounts are persisted (no precision loss, no hex ambiguity).
pub mod u256_decimal {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str_radix(&raw, 10).map_err(D::Error::custom)
    }
}

/// Serde adapter for a 32-byte hash as 0x-hex.
pub mod hex_hash {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_hash(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_hash(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for an optional proof path as a sequence of 0x-hex hashes.
pub mod hex_hash_vec_opt {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<[u8; 32]>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|proof| proof.iter().map(super::encode_hash).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<[u8; 32]>>, D::Error> {
        let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
        raw.map(|proof| {
            proof
                .iter()
                .map(|h| super::decode_hash(h).map_err(D::Error::custom))
                .collect()
        })
        .transpose()
    }
}
