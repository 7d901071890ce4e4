use std::path::PathBuf;

use alloy_primitives::Address;

use crate::chain::ChainError;

/// Connection and signing settings for the live BSC client.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    /// JSON-RPC endpoint of a BSC node.
    pub rpc_url: String,
    /// Address of the deployed AMD distributor contract.
    pub contract_address: Address,
    /// Path to the encrypted admin keystore (web3 secret storage format).
    pub keystore_path: PathBuf,
    /// Passphrase for the keystore. Root updates are impossible without it;
    /// its absence aborts a generation before any chain or store write.
    pub keystore_passphrase: Option<String>,
}

impl ChainSettings {
    pub fn ensure_writable(&self) -> Result<(), ChainError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ChainError::Config("rpc url is not configured".to_string()));
        }
        self.passphrase()?;
        if !self.keystore_path.exists() {
            return Err(ChainError::Config(format!(
                "keystore file {:?} does not exist",
                self.keystore_path
            )));
        }
        Ok(())
    }

    pub fn passphrase(&self) -> Result<&str, ChainError> {
        self.keystore_passphrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ChainError::Config("keystore passphrase is not configured".to_string())
            })
    }
}
