use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// The mining loop reports each time the issued amount reaches a multiple of this.
const REPORT_EVERY: u64 = 100;
/// Minimum wait before retrying a block the node abandoned.
const CONFLICT_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the minimal ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Keep asking the node to mine blocks
    Mine {
        /// Stop after this many blocks; runs forever when omitted
        #[arg(long)]
        blocks: Option<u64>,
        /// Pause between mining requests, in milliseconds
        #[arg(long, default_value_t = 0)]
        pause_ms: u64,
    },
    /// Print the node's full chain
    Chain,
    /// Register a peer with the node
    Register {
        /// Peer address, e.g. http://127.0.0.1:5001
        #[arg(long)]
        address: String,
        /// Identifier of the peer
        #[arg(long)]
        identifier: Option<String>,
    },
    /// Ask the node to reconcile with its peers
    Resolve,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct Register {
    address: String,
    identifier: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Mined {
    index: u64,
    proof: u64,
    replaced: bool,
}

#[derive(Deserialize)]
struct Amount {
    amount: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node.trim_end_matches('/').to_string();

    match cli.cmd {
        Command::Submit {
            sender,
            recipient,
            amount,
        } => {
            let tx = Tx {
                sender,
                recipient,
                amount,
            };
            let res = client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Mine { blocks, pause_ms } => {
            mine_loop(&client, &node, blocks, Duration::from_millis(pause_ms)).await?;
        }
        Command::Chain => {
            let res = client.get(format!("{node}/chain")).send().await?;
            print_response(res).await?;
        }
        Command::Register {
            address,
            identifier,
        } => {
            let res = client
                .post(format!("{node}/nodes/register"))
                .json(&Register {
                    address,
                    identifier,
                })
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Resolve => {
            let res = client.get(format!("{node}/nodes/resolve")).send().await?;
            print_response(res).await?;
        }
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

async fn mine_loop(
    client: &reqwest::Client,
    node: &str,
    blocks: Option<u64>,
    pause: Duration,
) -> Result<()> {
    info!(%node, "mining");
    let mut mined = 0u64;
    let mut last_report = None;

    while blocks.is_none_or(|limit| mined < limit) {
        let res = client.get(format!("{node}/mine")).send().await?;
        let status = res.status();
        if status == reqwest::StatusCode::CONFLICT {
            let delay = retry_delay(pause);
            warn!(?delay, "node abandoned the block, retrying");
            tokio::time::sleep(delay).await;
            continue;
        }
        if !status.is_success() {
            bail!("mining failed with {status}: {}", res.text().await?);
        }
        let block: Mined = res.json().await?;
        mined += 1;
        debug!(index = block.index, proof = block.proof, replaced = block.replaced, "block mined");

        let Amount { amount } = client
            .get(format!("{node}/amount"))
            .send()
            .await?
            .json()
            .await?;
        let milestone = amount / REPORT_EVERY;
        if milestone > 0 && last_report != Some(milestone) {
            println!("{}th has been reached", milestone * REPORT_EVERY);
            last_report = Some(milestone);
        }

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(())
}

fn retry_delay(pause: Duration) -> Duration {
    pause.max(CONFLICT_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_node_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ledger-cli",
            "submit",
            "--sender",
            "alice",
            "--recipient",
            "bob",
            "--amount",
            "5",
            "--node",
            "http://10.0.0.1:5000",
        ])
        .unwrap();
        assert_eq!(cli.node, "http://10.0.0.1:5000");
        assert!(matches!(cli.cmd, Command::Submit { amount: 5, .. }));
    }

    #[test]
    fn mine_defaults_to_unbounded() {
        let cli = Cli::try_parse_from(["ledger-cli", "mine"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Command::Mine {
                blocks: None,
                pause_ms: 0
            }
        ));
    }

    #[test]
    fn conflict_retry_never_spins() {
        assert_eq!(retry_delay(Duration::ZERO), CONFLICT_BACKOFF);
        assert_eq!(retry_delay(Duration::from_millis(10)), CONFLICT_BACKOFF);
        assert_eq!(retry_delay(Duration::from_secs(2)), Duration::from_secs(2));
    }
}
