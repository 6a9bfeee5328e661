//! Handoff file between the improvement cycle and the social bridge.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::util::write_file;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQueueEntry {
    pub theme: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub main_url: String,
    #[serde(default)]
    pub provided_summary: String,
}

/// Read the queue. A missing file is an empty queue.
pub fn load_queue(path: &Path) -> Result<Vec<PostQueueEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn save_queue(path: &Path, entries: &[PostQueueEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries).context("Failed to serialize post queue")?;
    write_file(path, &json)
}
