//! Fetching peer chains and reconciling against them.

use crate::state::AppState;
use anyhow::{Context, Result};
use ledger_core::{
    consensus::{resolve, select_longest},
    PeerSnapshot, ResolvedOutcome,
};
use reqwest::Client;
use tracing::{debug, warn};

pub async fn fetch_snapshot(http: &Client, address: &str) -> Result<PeerSnapshot> {
    let url = format!("http://{address}/chain");
    let snapshot = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?
        .json::<PeerSnapshot>()
        .await
        .with_context(|| format!("decoding chain from {address}"))?;
    Ok(snapshot)
}

/// Fetch every address concurrently. Results keep the order of `addresses`;
/// unreachable peers and undecodable replies are dropped.
pub async fn fetch_all(http: &Client, addresses: Vec<String>) -> Vec<PeerSnapshot> {
    let handles: Vec<_> = addresses
        .into_iter()
        .map(|address| {
            let http = http.clone();
            tokio::spawn(async move {
                let result = fetch_snapshot(&http, &address).await;
                (address, result)
            })
        })
        .collect();

    let mut snapshots = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((address, Ok(snapshot))) => {
                debug!(%address, length = snapshot.length, "fetched peer chain");
                snapshots.push(snapshot);
            }
            Ok((address, Err(e))) => warn!(%address, error = %format!("{e:#}"), "skipping peer"),
            Err(e) => warn!(error = %e, "peer fetch task failed"),
        }
    }
    snapshots
}

/// Run consensus against every registered peer except ourselves.
///
/// Validation of the candidates happens off the async runtime and without
/// the chain lock; the winner is re-checked under the write lock, so a chain
/// that grew meanwhile is never replaced by a shorter one.
pub async fn resolve_with_peers(state: &AppState) -> Result<ResolvedOutcome> {
    let addresses: Vec<String> = state
        .peers
        .read()
        .await
        .iter()
        .filter(|p| p.address != *state.self_address)
        .map(|p| p.address.clone())
        .collect();
    let snapshots = fetch_all(&state.http, addresses).await;

    let local_length = state.chain.read().await.len();
    let candidate = tokio::task::spawn_blocking(move || select_longest(local_length, snapshots))
        .await
        .context("validating peer chains")?;

    let mut chain = state.chain.write().await;
    let outcome = match candidate {
        Some(blocks) => resolve(
            &mut chain,
            [PeerSnapshot {
                length: blocks.len(),
                chain: blocks,
            }],
        ),
        None => ResolvedOutcome {
            adopted: false,
            length: chain.len(),
        },
    };
    if outcome.adopted {
        state.miner.abort_current();
    }
    Ok(outcome)
}
