use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::SiteGenError;
use crate::llm::retry::{Backoff, RetryOn, RetryPolicy};
use crate::util::SecretString;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    /// Model for planning stages (identity, sitemap, strategy, article plans)
    pub model: String,
    /// Optional: separate model for full-page HTML generation
    #[serde(default)]
    pub page_model: Option<String>,
    /// Environment variable holding one API key or a comma-separated list
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>, // For OpenAI-compatible APIs

    /// Optional: Override max_tokens for LLM requests
    /// If not specified, uses provider-specific defaults:
    /// - anthropic: 16384
    /// - openai: 16384
    /// - openai-compatible (ollama): 16384
    /// - gemini: 32768
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// HTTP request timeout in seconds (default: 300)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Get max_tokens value, using provider-specific default if not specified
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        // Full HTML documents are long; keep generous ceilings
        match self.provider.as_str() {
            "gemini" => 32768,
            _ => 16384,
        }
    }

    /// Model used for page HTML generation
    pub fn get_page_model(&self) -> &str {
        self.page_model.as_deref().unwrap_or(&self.model)
    }

    /// Resolve the credential pool from the configured environment variable.
    /// Keys are comma separated; blanks are dropped.
    pub fn get_api_keys(&self) -> Result<Vec<SecretString>> {
        let env_var = match &self.api_key_env {
            Some(v) => v,
            None => return Ok(vec![SecretString::new(String::new())]),
        };

        // Special case: "none" means no API key needed (e.g., Ollama)
        if env_var.to_lowercase() == "none" {
            return Ok(vec![SecretString::new(String::new())]);
        }

        let raw = env::var(env_var).unwrap_or_default();
        let keys = parse_key_list(&raw);

        if keys.is_empty() {
            // Local OpenAI-compatible servers run without keys
            if self.provider == "openai-compatible" {
                return Ok(vec![SecretString::new(String::new())]);
            }
            return Err(SiteGenError::setup(format!(
                "API key not found in environment variable: {}",
                env_var
            ))
            .into());
        }

        Ok(keys)
    }
}

/// Split a comma-separated key list, trimming and dropping blanks.
pub fn parse_key_list(raw: &str) -> Vec<SecretString> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::new(k.to_string()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Attempts per page before giving up (default: 3)
    pub max_retries: usize,

    /// Pause between page attempts in seconds (default: 5)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Attempts for article planning on overloaded errors (default: 3)
    #[serde(default = "default_planning_retries")]
    pub planning_max_retries: usize,

    /// Base delay for article planning backoff in seconds (default: 10)
    #[serde(default = "default_planning_backoff")]
    pub planning_backoff_secs: u64,

    /// New articles per improvement cycle (default: 3)
    #[serde(default = "default_articles_per_cycle")]
    pub articles_per_cycle: usize,

    /// Sections left out of the balance analysis
    #[serde(default = "default_excluded_sections")]
    pub excluded_sections: Vec<String>,

    /// Hub used when the model picks a hub that does not exist
    #[serde(default = "default_fallback_hub")]
    pub fallback_hub: String,

    /// Run tag injection at the end of an improvement cycle (default: true)
    #[serde(default = "default_true")]
    pub inject_tags_after_cycle: bool,

    /// Copyright holder for personal sites (defaults to the generated site name)
    #[serde(default)]
    pub owner_name: Option<String>,
}

impl GenerationConfig {
    /// Policy for page generation: any failure retries, rotating credentials.
    pub fn page_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            delay: Duration::from_secs(self.retry_delay_secs),
            backoff: Backoff::Fixed,
            rotate_credentials: true,
            retry_on: RetryOn::AnyFailure,
        }
    }

    /// Policy for article planning: only overloaded errors retry, with
    /// exponential backoff.
    pub fn planning_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.planning_max_retries.max(1),
            delay: Duration::from_secs(self.planning_backoff_secs),
            backoff: Backoff::Exponential,
            rotate_credentials: true,
            retry_on: RetryOn::OverloadedOnly,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Raw statement of purpose, relative to the project root
    #[serde(default = "default_opinion_file")]
    pub opinion_file: String,
    /// Generated site directory
    #[serde(default = "default_site_dir")]
    pub site_dir: String,
    /// Checkpoint reports directory
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Handoff file for the social bridge
    #[serde(default = "default_queue_file")]
    pub queue_file: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            opinion_file: default_opinion_file(),
            site_dir: default_site_dir(),
            reports_dir: default_reports_dir(),
            queue_file: default_queue_file(),
        }
    }
}

impl ProjectConfig {
    pub fn layout(&self, root: &Path) -> ProjectLayout {
        ProjectLayout {
            root: root.to_path_buf(),
            opinion_file: root.join(&self.opinion_file),
            site_dir: root.join(&self.site_dir),
            reports_dir: root.join(&self.reports_dir),
            queue_file: root.join(&self.queue_file),
        }
    }
}

/// Resolved on-disk locations for one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub opinion_file: PathBuf,
    pub site_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub queue_file: PathBuf,
}

impl ProjectLayout {
    pub fn report(&self, name: &str) -> PathBuf {
        self.reports_dir.join(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Explicit GTM container ID (takes precedence over the env var)
    #[serde(default)]
    pub gtm_id: Option<String>,
    #[serde(default = "default_gtm_env")]
    pub gtm_id_env: String,
    /// Explicit AdSense client ID (takes precedence over the env var)
    #[serde(default)]
    pub adsense_client_id: Option<String>,
    #[serde(default = "default_adsense_env")]
    pub adsense_client_id_env: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            gtm_id: None,
            gtm_id_env: default_gtm_env(),
            adsense_client_id: None,
            adsense_client_id_env: default_adsense_env(),
        }
    }
}

/// Analytics identifiers resolved from config and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsIds {
    pub gtm_id: Option<String>,
    pub adsense_client_id: Option<String>,
}

impl AnalyticsIds {
    pub fn is_empty(&self) -> bool {
        self.gtm_id.is_none() && self.adsense_client_id.is_none()
    }
}

impl AnalyticsConfig {
    pub fn resolve(&self) -> AnalyticsIds {
        AnalyticsIds {
            gtm_id: non_empty(self.gtm_id.clone()).or_else(|| env_value(&self.gtm_id_env)),
            adsense_client_id: non_empty(self.adsense_client_id.clone())
                .or_else(|| env_value(&self.adsense_client_id_env)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Public base URL of the site; derived from the repository env var if unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// `owner/repo` env var used to derive a GitHub Pages URL
    #[serde(default = "default_repository_env")]
    pub repository_env: String,
    /// Keywords attached to every queued post
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Bearer token env var for the posting endpoint
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_post_endpoint")]
    pub endpoint: String,
    /// Optional persona text file used to voice posts
    #[serde(default)]
    pub persona_file: Option<String>,
    /// Knowledge log, relative to the project root
    #[serde(default = "default_knowledge_log")]
    pub knowledge_log: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            repository_env: default_repository_env(),
            keywords: default_keywords(),
            token_env: default_token_env(),
            endpoint: default_post_endpoint(),
            persona_file: None,
            knowledge_log: default_knowledge_log(),
        }
    }
}

impl SocialConfig {
    /// Public site URL, always ending in `/`.
    /// Explicit config wins, then `https://<owner>.github.io/<repo>/`.
    pub fn site_base_url(&self) -> Option<String> {
        if let Some(url) = non_empty(self.base_url.clone()) {
            return Some(if url.ends_with('/') {
                url
            } else {
                format!("{}/", url)
            });
        }
        let repo = env_value(&self.repository_env)?;
        let (owner, name) = repo.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("https://{}.github.io/{}/", owner, name))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_value(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_retry_delay() -> u64 {
    5
}

fn default_planning_retries() -> usize {
    3
}

fn default_planning_backoff() -> u64 {
    10
}

fn default_articles_per_cycle() -> usize {
    3
}

fn default_excluded_sections() -> Vec<String> {
    ["legal", "contact", "projects", "about"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_hub() -> String {
    "insights/index.html".to_string()
}

fn default_true() -> bool {
    true
}

fn default_opinion_file() -> String {
    "config/opinion.txt".to_string()
}

fn default_site_dir() -> String {
    "docs".to_string()
}

fn default_reports_dir() -> String {
    "output_reports".to_string()
}

fn default_queue_file() -> String {
    "newly_updated_articles.json".to_string()
}

fn default_gtm_env() -> String {
    "GTM_ID".to_string()
}

fn default_adsense_env() -> String {
    "ADSENSE_CLIENT_ID".to_string()
}

fn default_repository_env() -> String {
    "GITHUB_REPOSITORY".to_string()
}

fn default_keywords() -> Vec<String> {
    vec!["AI".to_string(), "insights".to_string()]
}

fn default_token_env() -> String {
    "X_BEARER_TOKEN".to_string()
}

fn default_post_endpoint() -> String {
    "https://api.twitter.com/2/tweets".to_string()
}

fn default_knowledge_log() -> String {
    "knowledge_entries.json".to_string()
}

impl Config {
    /// Load config from the working directory or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // If explicit path provided, use it
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        // Try working directory first (per-project config)
        if let Ok(config) = Self::load_from_path("sitegen.toml") {
            debug!("Loaded config from ./sitegen.toml");
            return Ok(config);
        }

        // Try user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("sitegen").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        // Return defaults
        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: "gemini".to_string(),
                model: "gemini-2.5-flash".to_string(),
                page_model: Some("gemini-2.5-pro".to_string()),
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                base_url: None,
                max_tokens: None,
                timeout_secs: default_timeout_secs(),
            },
            generation: GenerationConfig {
                max_retries: 3,
                retry_delay_secs: default_retry_delay(),
                planning_max_retries: default_planning_retries(),
                planning_backoff_secs: default_planning_backoff(),
                articles_per_cycle: default_articles_per_cycle(),
                excluded_sections: default_excluded_sections(),
                fallback_hub: default_fallback_hub(),
                inject_tags_after_cycle: true,
                owner_name: None,
            },
            project: ProjectConfig::default(),
            analytics: AnalyticsConfig::default(),
            social: SocialConfig::default(),
        }
    }
}
