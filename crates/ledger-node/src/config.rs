use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "HTTP node for the minimal proof-of-work ledger")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, env = "LEDGER_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: String,

    /// Port to listen on; overrides the port part of --listen
    #[arg(short, long, env = "LEDGER_PORT")]
    pub port: Option<u16>,

    /// File holding known peers, one `address identifier` per line
    #[arg(long, env = "LEDGER_NODES_FILE", default_value = "nodes.txt")]
    pub nodes_file: PathBuf,

    /// Identifier of this node; random when omitted
    #[arg(long, env = "LEDGER_NODE_ID")]
    pub node_id: Option<String>,

    /// Per-peer timeout when fetching chains during consensus
    #[arg(long, env = "LEDGER_PEER_TIMEOUT_SECS", default_value_t = 5)]
    pub peer_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    pub nodes_file: PathBuf,
    pub node_id: String,
    pub peer_timeout: Duration,
}

impl NodeConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let mut listen: SocketAddr = args
            .listen
            .parse()
            .with_context(|| format!("invalid listen address {:?}", args.listen))?;
        if let Some(port) = args.port {
            listen.set_port(port);
        }
        Ok(Self {
            listen,
            nodes_file: args.nodes_file,
            node_id: args.node_id.unwrap_or_else(random_node_id),
            peer_timeout: Duration::from_secs(args.peer_timeout_secs),
        })
    }
}

fn random_node_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
