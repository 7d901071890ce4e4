use alloy::{
    network::EthereumWallet,
    providers::{Provider, ProviderBuilder},
    rpc::types::Filter,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::{decode_revert_reason, SolEvent},
};
use alloy_primitives::B256;
use async_trait::async_trait;
use tracing::{info, warn};

use super::{ChainError, ClaimScan, ClaimedEvent, DistributorChain, RootUpdate};
use crate::config::ChainSettings;

sol! {
    #[sol(rpc)]
    contract AmdDistributor {
        function merkleRoot() external view returns (bytes32);
        function updateMerkleRoot(bytes32 newRoot) external;

        event MerkleRootUpdated(bytes32 newRoot);
        event Claimed(address indexed account, uint256 amount);
    }
}

/// Live client for the AMD distributor contract on BSC. Reads need only the
/// RPC endpoint; the signing key is decrypted from the keystore at update
/// time and never cached.
pub struct BscDistributorClient {
    settings: ChainSettings,
}

impl BscDistributorClient {
    pub fn new(settings: ChainSettings) -> Self {
        Self { settings }
    }

    async fn read_provider(&self) -> Result<impl Provider + Clone, ChainError> {
        ProviderBuilder::new()
            .connect(&self.settings.rpc_url)
            .await
            .map_err(|e| ChainError::Network(e.to_string()))
    }
}

fn map_contract_error(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(transport) => match transport.as_error_resp() {
            Some(payload) => {
                if let Some(data) = payload.as_revert_data() {
                    return match decode_revert_reason(&data) {
                        Some(reason) => ChainError::RevertWithReason(reason),
                        None => ChainError::Revert,
                    };
                }
                ChainError::Network(payload.message.to_string())
            }
            None => ChainError::Network(transport.to_string()),
        },
        other => ChainError::Network(other.to_string()),
    }
}

#[async_trait]
impl DistributorChain for BscDistributorClient {
    fn ensure_writable(&self) -> Result<(), ChainError> {
        self.settings.ensure_writable()
    }

    async fn merkle_root(&self) -> Result<[u8; 32], ChainError> {
        let provider = self.read_provider().await?;
        let contract = AmdDistributor::new(self.settings.contract_address, provider);
        let root = contract
            .merkleRoot()
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(root.0)
    }

    async fn update_merkle_root(&self, new_root: [u8; 32]) -> Result<RootUpdate, ChainError> {
        let passphrase = self.settings.passphrase()?;
        let signer = PrivateKeySigner::decrypt_keystore(&self.settings.keystore_path, passphrase)
            .map_err(|e| ChainError::Config(format!("failed to decrypt keystore: {e}")))?;
        info!(admin = %signer.address(), "submitting merkle root update");

        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(&self.settings.rpc_url)
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;
        let contract = AmdDistributor::new(self.settings.contract_address, provider);

        let pending = contract
            .updateMerkleRoot(B256::from(new_root))
            .send()
            .await
            .map_err(map_contract_error)?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        let transaction_hash = receipt.transaction_hash;
        if !receipt.status() {
            return Err(ChainError::TransactionFailed(format!(
                "{transaction_hash:#x}"
            )));
        }

        let event_seen = receipt
            .inner
            .logs()
            .iter()
            .any(|log| log.topic0() == Some(&AmdDistributor::MerkleRootUpdated::SIGNATURE_HASH));
        if !event_seen {
            warn!(tx = %format!("{transaction_hash:#x}"), "receipt is missing the MerkleRootUpdated event");
        }

        Ok(RootUpdate {
            transaction_hash,
            event_seen,
        })
    }

    async fn claimed_events(&self, from_block: u64) -> Result<ClaimScan, ChainError> {
        let provider = self.read_provider().await?;
        let latest = provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;
        if from_block > latest {
            return Ok(ClaimScan {
                events: Vec::new(),
                next_block: from_block,
            });
        }

        let filter = Filter::new()
            .address(self.settings.contract_address)
            .event_signature(AmdDistributor::Claimed::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(latest);
        let logs = provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let decoded = AmdDistributor::Claimed::decode_log(&log.inner)
                .map_err(|e| ChainError::Network(format!("undecodable Claimed log: {e}")))?;
            events.push(ClaimedEvent {
                wallet: decoded.data.account,
                amount: decoded.data.amount,
                transaction_hash: log.transaction_hash.unwrap_or_default(),
                block_number: log.block_number.unwrap_or(latest),
            });
        }

        Ok(ClaimScan {
            events,
            next_block: latest + 1,
        })
    }
}
