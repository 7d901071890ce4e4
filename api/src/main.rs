mod error;
mod router;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use alloy_primitives::Address;
use amd_distributor_service::{
    chain::{BscDistributorClient, DistributorChain, MockChain},
    config::ChainSettings,
    listener::ClaimEventListener,
    pipeline::DistributionPipeline,
    store::MemoryStore,
};
use clap::Parser;
use router::RouterState;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::error::ApiError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Bind address for the server
    #[clap(long, env, default_value_t = SocketAddr::from_str("0.0.0.0:7001").unwrap())]
    bind_addr: SocketAddr,

    /// Path of the JSON store snapshot
    #[clap(long, env)]
    store_path: PathBuf,

    /// BSC RPC url
    #[clap(long, env)]
    rpc_url: String,

    /// Address of the AMD distributor contract
    #[clap(long, env)]
    contract_address: Address,

    /// Path to the admin JSON keystore
    #[clap(long, env)]
    keystore_path: PathBuf,

    /// Keystore passphrase. Read from the environment, never from argv.
    #[clap(long, env = "KEYSTORE_PASSPHRASE", hide_env_values = true)]
    keystore_passphrase: Option<String>,

    /// Block to start scanning Claimed events from
    #[clap(long, env, default_value_t = 0)]
    start_block: u64,

    /// Seconds between Claimed event scans
    #[clap(long, env, default_value_t = 15)]
    poll_interval_secs: u64,

    /// Use the in-memory mock chain instead of BSC
    #[clap(long, env)]
    mock_chain: bool,

    /// Expose POST /regenerate. Off by default; only the admin deployment
    /// should publish roots.
    #[clap(long, env)]
    enable_regenerate_endpoint: bool,
}

#[tokio::main]
#[instrument]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt().init();

    info!("starting server at {}", args.bind_addr);

    let store = Arc::new(MemoryStore::load_from_file(&args.store_path)?);
    info!("loaded store from {}", args.store_path.display());

    let chain: Arc<dyn DistributorChain> = if args.mock_chain {
        info!("using mock chain");
        Arc::new(MockChain::new())
    } else {
        Arc::new(BscDistributorClient::new(ChainSettings {
            rpc_url: args.rpc_url.clone(),
            contract_address: args.contract_address,
            keystore_path: args.keystore_path.clone(),
            keystore_passphrase: args.keystore_passphrase.clone(),
        }))
    };

    let pipeline = Arc::new(DistributionPipeline::new(store.clone(), chain.clone()));

    let (listener, listener_health) = ClaimEventListener::new(
        store.clone(),
        chain,
        Duration::from_secs(args.poll_interval_secs),
        args.start_block,
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(listener.run(shutdown_rx));

    let state = Arc::new(RouterState {
        store,
        pipeline,
        listener_health,
        store_path: Some(args.store_path.clone()),
    });

    let app = router::get_routes(state, args.enable_regenerate_endpoint);

    axum::Server::bind(&args.bind_addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}
