//! Turns queued articles into social posts and records what was posted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::poster::SocialPoster;
use super::queue::{load_queue, PostQueueEntry};
use crate::llm::client::{LlmClient, ResponseFormat};
use crate::llm::prompts;
use crate::util::{strip_code_fence, write_file};

pub const DEFAULT_PERSONA: &str = "You are a thoughtful commentator on the topics this site covers. \
Comment only on the article's subject, in a calm and curious voice. \
Never talk about yourself, your role or any organisation name.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub overview: String,
    pub details: String,
    #[serde(default)]
    pub trends: String,
    #[serde(default)]
    pub scraped_sources: Vec<String>,
}

impl ResearchSummary {
    pub fn from_entry(entry: &PostQueueEntry) -> Self {
        let details = if entry.provided_summary.trim().is_empty() {
            "No details provided.".to_string()
        } else {
            entry.provided_summary.clone()
        };
        Self {
            overview: entry.theme.clone(),
            details,
            trends: if entry.keywords.is_empty() {
                String::new()
            } else {
                format!("Related to: {}", entry.keywords.join(", "))
            },
            scraped_sources: vec![entry.main_url.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic_id: String,
    pub created_at: DateTime<Utc>,
    pub source_urls_selected: Vec<String>,
    pub research_summary: ResearchSummary,
    /// `{tweet, thought_process}` as returned by the model; `{}` on failure
    pub character_post: serde_json::Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KnowledgeLog {
    #[serde(default)]
    knowledge_entries: Vec<KnowledgeEntry>,
}

/// Append one entry to the knowledge log, starting a fresh log if the
/// existing file is unreadable.
pub fn append_knowledge(path: &Path, entry: KnowledgeEntry) -> Result<()> {
    let mut log = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<KnowledgeLog>(&content).unwrap_or_else(|e| {
            warn!("Knowledge log {} unreadable ({}), starting over", path.display(), e);
            KnowledgeLog::default()
        })
    } else {
        KnowledgeLog::default()
    };
    log.knowledge_entries.push(entry);
    let json = serde_json::to_string_pretty(&log).context("Failed to serialize knowledge log")?;
    write_file(path, &json)
}

/// Post text with the article URL guaranteed to be present.
pub fn post_text(tweet: &str, url: &str) -> String {
    let tweet = tweet.trim();
    if url.is_empty() || tweet.contains(url) {
        tweet.to_string()
    } else {
        format!("{} {}", tweet, url)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeReport {
    pub processed: usize,
    pub posted: usize,
    pub failed: usize,
}

pub struct SocialBridge<'a> {
    client: &'a dyn LlmClient,
    poster: &'a dyn SocialPoster,
    knowledge_log: PathBuf,
    persona: String,
}

impl<'a> SocialBridge<'a> {
    pub fn new(client: &'a dyn LlmClient, poster: &'a dyn SocialPoster, knowledge_log: PathBuf) -> Self {
        Self {
            client,
            poster,
            knowledge_log,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    pub fn with_persona(mut self, persona: String) -> Self {
        if !persona.trim().is_empty() {
            self.persona = persona;
        }
        self
    }

    /// Post every queued article. A missing queue is nothing to do.
    pub async fn run(&self, queue_path: &Path) -> Result<BridgeReport> {
        let mut report = BridgeReport::default();
        if !queue_path.exists() {
            info!("No post queue at {}, nothing to post", queue_path.display());
            return Ok(report);
        }

        let entries = load_queue(queue_path)?;
        let run_stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        for (i, entry) in entries.iter().enumerate() {
            info!("Post {}/{}: {}", i + 1, entries.len(), entry.theme);
            report.processed += 1;

            let research = ResearchSummary::from_entry(entry);
            let character_post = self.compose(entry, &research).await;
            let tweet = character_post
                .get("tweet")
                .and_then(|t| t.as_str())
                .filter(|t| !t.trim().is_empty());

            match tweet {
                Some(tweet) => {
                    let text = post_text(tweet, &entry.main_url);
                    match self.poster.post(&text).await {
                        Ok(id) => {
                            info!(
                                "  ✓ Posted{}",
                                id.map(|post_id| format!(" ({})", post_id)).unwrap_or_default()
                            );
                            report.posted += 1;
                        }
                        Err(e) => {
                            warn!("Posting failed for {}: {:#}", entry.main_url, e);
                            report.failed += 1;
                        }
                    }
                }
                None => {
                    warn!("No post text generated for {}", entry.main_url);
                    report.failed += 1;
                }
            }

            let knowledge = KnowledgeEntry {
                topic_id: format!("auto_post_{}_{}", run_stamp, i),
                created_at: Utc::now(),
                source_urls_selected: vec![entry.main_url.clone()],
                research_summary: research,
                character_post,
            };
            if let Err(e) = append_knowledge(&self.knowledge_log, knowledge) {
                warn!("Could not record knowledge entry: {:#}", e);
            }
        }

        info!(
            "Bridge done: {} posted, {} failed",
            report.posted, report.failed
        );
        Ok(report)
    }

    async fn compose(&self, entry: &PostQueueEntry, research: &ResearchSummary) -> serde_json::Value {
        let research_json =
            serde_json::to_string_pretty(research).unwrap_or_else(|_| research.details.clone());
        let prompt = prompts::social_post(
            &self.persona,
            &entry.theme,
            &entry.main_url,
            &research_json,
            &entry.keywords,
        );
        match self.client.complete_with(&prompt, ResponseFormat::Json).await {
            Ok(response) => serde_json::from_str(strip_code_fence(&response)).unwrap_or_else(|e| {
                warn!("Post response is not JSON: {}", e);
                serde_json::json!({})
            }),
            Err(e) => {
                warn!("Post generation failed: {:#}", e);
                serde_json::json!({})
            }
        }
    }
}
