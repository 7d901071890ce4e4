use alloy_primitives::Address;

use crate::error::DistributorError;

/// Normalizes a user-supplied wallet address: trims surrounding whitespace,
/// validates the 20-byte hex form, and enforces the EIP-55 checksum when the
/// input is mixed-case. Uniform-case input carries no checksum and is
/// accepted as-is.
///
/// Callers must never store an address this function rejected; historical
/// whitespace and casing slip-ups are what the duplicate-wallet repair in
/// [`crate::repair`] exists to clean up.
pub fn normalize_wallet_address(raw: &str) -> Result<Address, DistributorError> {
    let invalid = |reason: &str| DistributorError::InvalidAddress {
        address: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("expected a 20-byte hex address"));
    }

    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(format!("0x{hex_part}"), None)
            .map_err(|_| invalid("EIP-55 checksum mismatch"))
    } else {
        format!("0x{hex_part}")
            .parse::<Address>()
            .map_err(|_| invalid("expected a 20-byte hex address"))
    }
}

/// EIP-55 checksummed string form, the canonical representation persisted in
/// user records.
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307";

    #[test]
    fn test_normalize_trims_whitespace() {
        let padded = format!("  {CHECKSUMMED}\n");
        let address = normalize_wallet_address(&padded).unwrap();
        assert_eq!(checksummed(&address), CHECKSUMMED);
    }

    #[test]
    fn test_normalize_accepts_lowercase() {
        let address = normalize_wallet_address(&CHECKSUMMED.to_lowercase()).unwrap();
        assert_eq!(checksummed(&address), CHECKSUMMED);
    }

    #[test]
    fn test_normalize_rejects_bad_checksum() {
        // Flip the case of one checksummed character.
        let mangled = CHECKSUMMED.replace("aA5307", "Aa5307");
        assert!(normalize_wallet_address(&mangled).is_err());
    }

    #[test]
    fn test_normalize_rejects_malformed_input() {
        assert!(normalize_wallet_address("").is_err());
        assert!(normalize_wallet_address("0x1234").is_err());
        assert!(normalize_wallet_address("not an address").is_err());
        assert!(
            normalize_wallet_address("0x41347A026E28f532Ca464bd4FfFa451bF1aA530Z").is_err()
        );
    }
}
