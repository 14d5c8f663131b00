use crate::{
    error::{ApiError, ApiResult},
    miner::{mine_next, MineError},
    peers::resolve_with_peers,
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Chain, Hash, MerkleTree, PeerSnapshot, ProofStep, Transaction};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/chain") }))
        .route("/health", get(health))
        .route("/chain", get(full_chain))
        .route("/chain/validate", get(validate_chain))
        .route("/mine", get(mine))
        .route("/amount", get(amount))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/proof", post(transaction_proof))
        .route("/nodes/register", post(register_node))
        .route("/nodes/get", get(get_nodes))
        .route("/nodes/reset", get(reset_nodes))
        .route("/nodes/resolve", get(resolve_nodes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn full_chain(State(state): State<AppState>) -> Json<PeerSnapshot> {
    Json(PeerSnapshot::of(&*state.chain.read().await))
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    length: usize,
    fault: Option<String>,
}

async fn validate_chain(State(state): State<AppState>) -> Json<Validity> {
    let chain = state.chain.read().await;
    let fault = Chain::check(chain.blocks()).err();
    Json(Validity {
        valid: fault.is_none(),
        length: chain.len(),
        fault: fault.map(|f| f.to_string()),
    })
}

#[derive(Serialize)]
struct MineResponse {
    message: &'static str,
    index: u64,
    merkle_root: Option<Hash>,
    proof: u64,
    previous_hash: Hash,
    transactions: usize,
    replaced: bool,
}

async fn mine(State(state): State<AppState>) -> ApiResult<Json<MineResponse>> {
    let block = mine_next(&state).await.map_err(|e| match e {
        MineError::Aborted | MineError::StaleTip => ApiError::conflict(e.to_string()),
        MineError::Internal(e) => ApiError::from(e),
    })?;
    let outcome = resolve_with_peers(&state).await?;

    Ok(Json(MineResponse {
        message: "New Block Forged",
        index: block.index,
        merkle_root: block.merkle_root,
        proof: block.proof,
        previous_hash: block.previous_hash,
        transactions: block.transactions.len(),
        replaced: outcome.adopted,
    }))
}

#[derive(Serialize)]
struct Amount {
    amount: u64,
}

async fn amount(State(state): State<AppState>) -> Json<Amount> {
    Json(Amount {
        amount: state.chain.read().await.issued(),
    })
}

#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct Message {
    message: String,
}

async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TxIn>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let Json(tx) = payload.map_err(|e| ApiError::bad_request(format!("Missing values: {e}")))?;
    let index = state
        .chain
        .write()
        .await
        .append_transaction(tx.sender, tx.recipient, tx.amount);
    Ok((
        StatusCode::CREATED,
        Json(Message {
            message: format!("Transaction will be added to the Block {index}"),
        }),
    ))
}

#[derive(Deserialize)]
struct ProofRequest {
    index: u64,
    transaction: Transaction,
}

#[derive(Serialize)]
struct ProofResponse {
    index: u64,
    merkle_root: Hash,
    proof: Vec<ProofStep>,
    verified: bool,
}

/// Inclusion proof for a transaction in a stored block.
async fn transaction_proof(
    State(state): State<AppState>,
    payload: Result<Json<ProofRequest>, JsonRejection>,
) -> ApiResult<Json<ProofResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.to_string()))?;
    let (transactions, merkle_root) = {
        let chain = state.chain.read().await;
        let block = chain
            .block(req.index)
            .ok_or_else(|| ApiError::not_found(format!("no block with index {}", req.index)))?;
        let root = block
            .merkle_root
            .ok_or_else(|| ApiError::not_found(format!("block {} has no transactions", req.index)))?;
        (block.transactions.clone(), root)
    };

    let tree = MerkleTree::build(&transactions)?;
    let proof = tree.proof_for(&req.transaction)?;
    let verified = MerkleTree::verify(&proof, &req.transaction, &merkle_root);
    Ok(Json(ProofResponse {
        index: req.index,
        merkle_root,
        proof,
        verified,
    }))
}

#[derive(Deserialize)]
struct RegisterIn {
    address: String,
    identifier: Option<String>,
}

#[derive(Serialize)]
struct Registered {
    message: String,
    total_nodes: usize,
}

async fn register_node(
    State(state): State<AppState>,
    payload: Result<Json<RegisterIn>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Registered>)> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.to_string()))?;
    let address = ledger_core::parse_address(&req.address)?;

    let mut peers = state.peers.write().await;
    let added = peers.register(&address, req.identifier.as_deref())?;
    if added {
        state
            .nodes_file
            .append(&address, req.identifier.as_deref())
            .await?;
    }
    let message = if added {
        format!("Node {address} has been added")
    } else {
        format!("Node {address} was already known")
    };
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            message,
            total_nodes: peers.len(),
        }),
    ))
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
}

async fn get_nodes(State(state): State<AppState>) -> Json<Nodes> {
    Json(Nodes {
        nodes: state.peers.read().await.addresses(),
    })
}

/// Forget every peer in memory. The nodes file is left as is and is read
/// again on the next start.
async fn reset_nodes(State(state): State<AppState>) -> Json<Message> {
    state.peers.write().await.reset();
    info!("peer registry reset");
    Json(Message {
        message: "Nodes have been reset".into(),
    })
}

#[derive(Serialize)]
struct Resolved {
    message: &'static str,
    adopted: bool,
    length: usize,
}

async fn resolve_nodes(State(state): State<AppState>) -> ApiResult<Json<Resolved>> {
    let outcome = resolve_with_peers(&state).await?;
    let message = if outcome.adopted {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Ok(Json(Resolved {
        message,
        adopted: outcome.adopted,
        length: outcome.length,
    }))
}
