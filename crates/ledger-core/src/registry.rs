//! Known peers, kept in registration order.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// `host:port`, without scheme or path.
    pub address: String,
    /// Identifier of the node that announced this address, if known.
    pub identifier: Option<String>,
}

/// Insertion-ordered peer set. Consensus walks peers in this order, so the
/// earliest registered peer wins a tie.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: Vec<Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns `false` if the address was already known, in which
    /// case the existing entry keeps its position.
    pub fn register(&mut self, address: &str, identifier: Option<&str>) -> Result<bool> {
        let address = parse_address(address)?;
        if self.contains(&address) {
            return Ok(false);
        }
        info!(%address, ?identifier, "registered peer");
        self.peers.push(Peer {
            address,
            identifier: identifier.map(str::to_owned),
        });
        Ok(true)
    }

    pub fn reset(&mut self) {
        self.peers.clear();
    }

    pub fn contains(&self, address: &str) -> bool {
        self.peers.iter().any(|p| p.address == address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.address.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Reduce `raw` to its `host[:port]` part.
///
/// Accepts full URLs (`http://10.0.0.5:5000/chain`) as well as bare
/// authorities (`10.0.0.5:5000`).
pub fn parse_address(raw: &str) -> Result<String> {
    let invalid = || LedgerError::InvalidAddress(raw.to_string());
    let trimmed = raw.trim();

    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let scheme_ok = scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !scheme_ok {
                return Err(invalid());
            }
            rest
        }
        None => trimmed,
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() || authority.chars().any(|c| c.is_whitespace() || c == '@') {
        return Err(invalid());
    }

    let check_port = |port: &str| port.parse::<u16>().map(|_| ()).map_err(|_| invalid());
    let host = if authority.starts_with('[') {
        // bracketed IPv6 literal, optionally followed by `:port`
        let close = authority.find(']').ok_or_else(invalid)?;
        let (host, tail) = authority.split_at(close + 1);
        match tail.strip_prefix(':') {
            Some(port) => check_port(port)?,
            None if tail.is_empty() => {}
            None => return Err(invalid()),
        }
        if host.len() == 2 {
            return Err(invalid());
        }
        host
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                check_port(port)?;
                host
            }
            Some(_) => return Err(invalid()),
            None => authority,
        }
    };
    if host.is_empty() {
        return Err(invalid());
    }
    Ok(authority.to_string())
}
