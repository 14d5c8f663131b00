//! Durable peer list: one `address identifier` pair per line.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NodesFile {
    path: PathBuf,
}

impl NodesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in file order. A missing file reads as empty.
    pub async fn load(&self) -> Result<Vec<(String, Option<String>)>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        let entries: Vec<_> = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let address = parts.next()?.to_string();
                Some((address, parts.next().map(str::to_owned)))
            })
            .collect();
        debug!(path = %self.path.display(), entries = entries.len(), "loaded nodes file");
        Ok(entries)
    }

    pub async fn append(&self, address: &str, identifier: Option<&str>) -> Result<()> {
        let line = match identifier {
            Some(id) => format!("{address} {id}\n"),
            None => format!("{address}\n"),
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
