use crate::{config::NodeConfig, nodes_file::NodesFile};
use anyhow::Result;
use ledger_core::{parse_address, Chain, PeerRegistry};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Abort flag for the running proof search, plus a lock so only one search
/// runs at a time.
#[derive(Clone, Default)]
pub struct Miner {
    abort: Arc<AtomicBool>,
    running: Arc<Mutex<()>>,
}

impl Miner {
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn running(&self) -> &Mutex<()> {
        &self.running
    }

    /// Ask the in-flight search, if any, to stop.
    pub fn abort_current(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub fn rearm(&self) {
        self.abort.store(false, Ordering::Relaxed);
    }
}

#[derive(Clone)]
pub struct AppState {
    /// The single mutual-exclusion boundary around chain mutation.
    pub chain: Arc<RwLock<Chain>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    pub nodes_file: Arc<NodesFile>,
    pub node_id: Arc<str>,
    /// Our own `host:port`, skipped when fetching peer chains.
    pub self_address: Arc<str>,
    pub http: reqwest::Client,
    pub miner: Miner,
}

impl AppState {
    /// Load the peer file and register this node in it.
    pub async fn init(config: &NodeConfig) -> Result<Self> {
        let nodes_file = NodesFile::new(&config.nodes_file);
        let self_address = parse_address(&config.listen.to_string())?;

        let mut registry = PeerRegistry::new();
        for (address, identifier) in nodes_file.load().await? {
            if let Err(e) = registry.register(&address, identifier.as_deref()) {
                warn!(%address, error = %e, "ignoring bad entry in nodes file");
            }
        }
        if registry.register(&self_address, Some(&config.node_id))? {
            nodes_file.append(&self_address, Some(&config.node_id)).await?;
        }
        info!(peers = registry.len(), file = %nodes_file.path().display(), "peer registry ready");

        let http = reqwest::Client::builder()
            .timeout(config.peer_timeout)
            .build()?;

        Ok(Self {
            chain: Arc::new(RwLock::new(Chain::new())),
            peers: Arc::new(RwLock::new(registry)),
            nodes_file: Arc::new(nodes_file),
            node_id: Arc::from(config.node_id.as_str()),
            self_address: Arc::from(self_address.as_str()),
            http,
            miner: Miner::default(),
        })
    }
}
