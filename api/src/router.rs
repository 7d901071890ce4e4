use std::{
    fmt::{Debug, Formatter},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use amd_distributor_service::{
    address::normalize_wallet_address,
    listener::ListenerHealth,
    pipeline::DistributionPipeline,
    store::{DistributorStore, MemoryStore},
};
use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use http::Request;
use serde_derive::{Deserialize, Serialize};
use tokio::sync::watch;
use tower::{
    buffer::BufferLayer, limit::RateLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer,
    ServiceBuilder,
};
use tower_http::{
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info, instrument, Span};

use crate::{error, error::ApiError, Result};

pub struct RouterState {
    pub store: Arc<MemoryStore>,
    pub pipeline: Arc<DistributionPipeline<MemoryStore>>,
    pub listener_health: watch::Receiver<ListenerHealth>,
    /// Snapshot path to flush after a successful regenerate.
    pub store_path: Option<PathBuf>,
}

impl Debug for RouterState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterState")
            .field("store_path", &self.store_path)
            .finish()
    }
}

#[instrument]
pub fn get_routes(state: Arc<RouterState>, enable_regenerate_endpoint: bool) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(error::handle_error)) // handle middleware errors explicitly!
        .layer(BufferLayer::new(100)) // buffer up to 100 requests in queue
        .layer(RateLimitLayer::new(1000, Duration::from_secs(10)))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(LoadShedLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started {} {}", request.method(), request.uri().path())
                })
                .on_response(
                    DefaultOnResponse::new()
                        .level(tracing_core::Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/users", get(get_users))
        .route("/distribution", get(get_distribution))
        .route("/proof/:wallet", get(get_proof))
        .route("/health/listener", get(get_listener_health))
        .route("/version", get(get_version));

    // the regenerate trigger publishes on-chain; keep it off unless this
    // deployment is the single admin writer
    if enable_regenerate_endpoint {
        router = router.route("/regenerate", post(regenerate));
    }

    router.layer(middleware).with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    /// Cumulative claimable amount, scaled decimal string
    pub amount: String,
    pub proof: Vec<String>,
}

/// Retrieve the active-distribution proof for a given wallet
#[instrument(ret)]
async fn get_proof(
    State(state): State<Arc<RouterState>>,
    Path(wallet): Path<String>,
) -> Result<impl IntoResponse> {
    let address = normalize_wallet_address(&wallet)
        .map_err(|_| ApiError::InvalidWallet(wallet.clone()))?;
    let user = state
        .store
        .user_by_wallet(&address.to_checksum(None))?
        .ok_or_else(|| ApiError::UserNotFound(wallet.clone()))?;
    let distribution = state
        .store
        .active_distribution()?
        .ok_or(ApiError::NoActiveDistribution)?;
    let stored = state
        .store
        .proof_for(distribution.id, user.id)?
        .ok_or_else(|| ApiError::ProofNotFound(wallet.clone()))?;

    Ok(Json(ProofResponse {
        amount: stored.amount,
        proof: stored.proof,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionResponse {
    pub id: u64,
    pub merkle_root: String,
    pub name: String,
    pub created_at: u64,
    pub proof_count: usize,
}

#[instrument(ret)]
async fn get_distribution(State(state): State<Arc<RouterState>>) -> Result<impl IntoResponse> {
    let distribution = state
        .store
        .active_distribution()?
        .ok_or(ApiError::NoActiveDistribution)?;
    let proof_count = state.store.proof_count(distribution.id)?;
    Ok(Json(DistributionResponse {
        id: distribution.id,
        merkle_root: distribution.merkle_root,
        name: distribution.name,
        created_at: distribution.created_at,
        proof_count,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub wallet_address: String,
}

#[instrument]
async fn get_users(State(state): State<Arc<RouterState>>) -> Result<impl IntoResponse> {
    let users = state
        .store
        .users()?
        .into_iter()
        .map(|u| UserResponse {
            id: u.id,
            wallet_address: u.wallet_address,
        })
        .collect::<Vec<_>>();
    Ok(Json(users))
}

#[instrument]
async fn get_listener_health(State(state): State<Arc<RouterState>>) -> impl IntoResponse {
    let health = state.listener_health.borrow().clone();
    Json(health)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub merkle_root: String,
    pub message: String,
}

/// Runs the full generation pipeline: aggregate, build, reconcile, persist.
#[instrument]
async fn regenerate(State(state): State<Arc<RouterState>>) -> Result<impl IntoResponse> {
    let name = format!(
        "distribution-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    );
    let outcome = state.pipeline.regenerate(&name).await?;

    if let Some(path) = &state.store_path {
        state
            .store
            .write_to_file(path)
            .map_err(ApiError::StoreError)?;
    }

    Ok(Json(RegenerateResponse {
        merkle_root: outcome.merkle_root,
        message: outcome.message,
    }))
}

async fn root() -> impl IntoResponse {
    "AMD distributor api"
}

#[instrument(ret)]
async fn get_version() -> impl IntoResponse {
    env!("CARGO_PKG_VERSION")
}
