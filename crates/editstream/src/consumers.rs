use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use editstream_hub::Subscription;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::edit::WikiEdit;

pub const EDIT_COUNTS_SCHEMA: &str = "editstream-edit-counts-v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCountsConfig {
    pub snapshot_path: PathBuf,
    pub write_every: usize,
}

impl EditCountsConfig {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            write_every: 32,
        }
    }

    pub fn with_write_every(mut self, write_every: usize) -> Self {
        self.write_every = write_every.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct EditCountsSnapshot<'a> {
    schema: &'static str,
    total_edits: u64,
    edits_by_wiki: &'a BTreeMap<String, u64>,
}

// Drains one hub subscription and periodically rewrites a JSON snapshot
// of per-wiki edit totals. Runs until the hub signals end-of-stream.
#[derive(Debug)]
pub struct EditCountsWriter {
    config: EditCountsConfig,
    edits_by_wiki: BTreeMap<String, u64>,
    total_edits: u64,
}

impl EditCountsWriter {
    pub fn new(config: EditCountsConfig) -> io::Result<Self> {
        if config.snapshot_path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "edit counts snapshot path must not be empty",
            ));
        }
        Ok(Self {
            config,
            edits_by_wiki: BTreeMap::new(),
            total_edits: 0,
        })
    }

    pub async fn run(mut self, mut subscription: Subscription<WikiEdit>) -> io::Result<()> {
        while let Some(edit) = subscription.recv().await {
            *self.edits_by_wiki.entry(edit.wiki.clone()).or_insert(0) += 1;
            self.total_edits += 1;
            if self.total_edits % self.config.write_every as u64 == 0 {
                self.write_snapshot()?;
            }
        }
        self.write_snapshot()
    }

    fn write_snapshot(&self) -> io::Result<()> {
        let snapshot = EditCountsSnapshot {
            schema: EDIT_COUNTS_SCHEMA,
            total_edits: self.total_edits,
            edits_by_wiki: &self.edits_by_wiki,
        };

        if let Some(parent) = self.config.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.config.snapshot_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)
            .map_err(|error| io::Error::other(format!("serialize edit counts: {error}")))?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

// Consumer-contract demonstration: logs each record on its own task and
// resolves to the number of records seen once the stream completes.
pub fn spawn_edit_logger(mut subscription: Subscription<WikiEdit>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0_u64;
        while let Some(edit) = subscription.recv().await {
            tracing::debug!(
                wiki = %edit.wiki,
                title = %edit.title,
                user = %edit.user,
                bot = edit.bot,
                "edit received"
            );
            seen += 1;
        }
        seen
    })
}
