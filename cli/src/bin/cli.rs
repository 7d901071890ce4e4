mod instructions;

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::Address;
use amd_distributor_service::{
    chain::{BscDistributorClient, DistributorChain, MockChain},
    config::ChainSettings,
};
use clap::{Parser, Subcommand};
use instructions::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// BSC RPC url
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Address of the AMD distributor contract
    #[clap(long, env, default_value_t = Address::ZERO)]
    pub contract_address: Address,

    /// Path to the admin JSON keystore
    #[clap(long, env, default_value = "./keystore.json")]
    pub keystore_path: PathBuf,

    /// Keystore passphrase. Read from the environment, never from argv.
    #[clap(long, env = "KEYSTORE_PASSPHRASE", hide_env_values = true)]
    pub keystore_passphrase: Option<String>,

    /// Path of the JSON store snapshot
    #[clap(long, env, default_value = "./store.json")]
    pub store_path: PathBuf,

    /// Use the in-memory mock chain instead of BSC
    #[clap(long, env)]
    pub mock_chain: bool,
}

impl Args {
    fn get_chain_client(&self) -> Arc<dyn DistributorChain> {
        if self.mock_chain {
            Arc::new(MockChain::new())
        } else {
            Arc::new(BscDistributorClient::new(ChainSettings {
                rpc_url: self.rpc_url.clone(),
                contract_address: self.contract_address,
                keystore_path: self.keystore_path.clone(),
                keystore_passphrase: self.keystore_passphrase.clone(),
            }))
        }
    }
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import an allocations CSV into the store, creating users as needed
    ImportAllocations(ImportAllocationsArgs),
    /// Build a Merkle tree from a CSV of recipients, without touching the store
    CreateMerkleTree(CreateMerkleTreeArgs),
    /// Run the full pipeline: aggregate, build, publish on-chain, persist proofs
    Regenerate(RegenerateArgs),
    /// Print the proof for one wallet from a tree file
    GetProof(GetProofArgs),
    /// Re-derive a tree file's root and check every proof in it
    Verify(VerifyArgs),
    /// Merge user rows whose wallets differ only by case or whitespace
    RepairWallets,
    /// Show the active distribution
    ShowDistribution,
    /// Generate a CSV of random recipients for testing
    CreateDummyCsv(CreateDummyCsvArgs),
}

#[derive(Parser, Debug)]
pub struct ImportAllocationsArgs {
    /// CSV path, columns: wallet, amount
    #[clap(long, env)]
    pub csv_path: PathBuf,

    /// Allocation kind: spending-reward, referral-reward or airdrop
    #[clap(long, env, default_value = "airdrop")]
    pub kind: String,
}

#[derive(Parser, Debug)]
pub struct CreateMerkleTreeArgs {
    /// CSV path
    #[clap(long, env)]
    pub csv_path: PathBuf,

    /// Merkle tree out path
    #[clap(long, env)]
    pub merkle_tree_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct RegenerateArgs {
    /// Name recorded on the new distribution
    #[clap(long, env)]
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct GetProofArgs {
    /// Merkle tree path
    #[clap(long, env)]
    pub merkle_tree_path: PathBuf,

    /// Recipient wallet address
    #[clap(long, env)]
    pub wallet: String,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Merkle tree path
    #[clap(long, env)]
    pub merkle_tree_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CreateDummyCsvArgs {
    /// CSV path
    #[clap(long, env)]
    pub csv_path: PathBuf,

    #[clap(long, env)]
    pub num_records: u64,

    /// Token amount per record, human units
    #[clap(long, env, default_value = "100")]
    pub amount: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().init();

    match &args.command {
        Commands::ImportAllocations(import_args) => {
            process_import_allocations(&args, import_args)?;
        }
        Commands::CreateMerkleTree(merkle_tree_args) => {
            process_create_merkle_tree(merkle_tree_args)?;
        }
        Commands::Regenerate(regenerate_args) => {
            process_regenerate(&args, regenerate_args).await?;
        }
        Commands::GetProof(get_proof_args) => {
            process_get_proof(get_proof_args)?;
        }
        Commands::Verify(verify_args) => {
            process_verify(verify_args)?;
        }
        Commands::RepairWallets => {
            process_repair_wallets(&args)?;
        }
        Commands::ShowDistribution => {
            process_show_distribution(&args)?;
        }
        Commands::CreateDummyCsv(dummy_args) => {
            process_create_dummy_csv(dummy_args)?;
        }
    }

    Ok(())
}
