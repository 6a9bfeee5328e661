//! Sitemap, content strategy, page list and site name.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

use super::types::{validate_file_name, SiteType, TargetPage};
use crate::error::SiteGenError;
use crate::llm::client::{LlmClient, ResponseFormat};
use crate::llm::prompts;
use crate::util::{slugify, strip_code_fence};

pub const DEFAULT_SLUG: &str = "default-site";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteName {
    pub site_name: String,
    pub slug: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageListShape {
    List(Vec<serde_json::Value>),
    Wrapped { pages: Vec<serde_json::Value> },
}

/// Parse the page-list response. Malformed entries and repeated file names
/// are dropped; an empty result is a structural failure.
pub fn parse_page_list(response: &str) -> Result<Vec<TargetPage>> {
    let body = strip_code_fence(response);
    let shape: PageListShape = serde_json::from_str(body).map_err(|e| {
        SiteGenError::structural(format!("page list is not valid JSON: {}", e))
    })?;
    let raw = match shape {
        PageListShape::List(items) => items,
        PageListShape::Wrapped { pages } => pages,
    };

    let mut seen = HashSet::new();
    let mut pages = Vec::with_capacity(raw.len());
    for item in raw {
        let page: TargetPage = match serde_json::from_value(item) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping malformed page entry: {}", e);
                continue;
            }
        };
        let page = TargetPage {
            file_name: page.file_name.trim().to_string(),
            ..page
        };
        if let Err(e) = validate_file_name(&page.file_name) {
            warn!("Skipping page '{}': {}", page.title, e);
            continue;
        }
        if !seen.insert(page.file_name.clone()) {
            warn!("Skipping duplicate page file name: {}", page.file_name);
            continue;
        }
        pages.push(page);
    }

    if pages.is_empty() {
        return Err(SiteGenError::structural("page list is empty").into());
    }
    Ok(pages)
}

/// Parse `{site_name, slug}`. The slug is normalised; a missing or
/// unusable slug falls back to the slugified name, then to [`DEFAULT_SLUG`].
pub fn parse_site_name(response: &str) -> Option<SiteName> {
    #[derive(Deserialize)]
    struct Raw {
        site_name: String,
        #[serde(default)]
        slug: String,
    }

    let raw: Raw = serde_json::from_str(strip_code_fence(response)).ok()?;
    let site_name = raw.site_name.trim().to_string();
    if site_name.is_empty() {
        return None;
    }
    let slug = [slugify(&raw.slug), slugify(&site_name)]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SLUG.to_string());
    Some(SiteName { site_name, slug })
}

/// Planning stages that run after the identity is known.
pub struct SiteArchitect<'a> {
    client: &'a dyn LlmClient,
    site_type: SiteType,
}

impl<'a> SiteArchitect<'a> {
    pub fn new(client: &'a dyn LlmClient, site_type: SiteType) -> Self {
        Self { client, site_type }
    }

    async fn ask(&self, stage: &str, prompt: &str, format: ResponseFormat) -> Result<String> {
        let response = self
            .client
            .complete_with(prompt, format)
            .await
            .map_err(|e| SiteGenError::transient(format!("{} request failed: {:#}", stage, e)))?;
        let response = response.trim();
        if response.is_empty() {
            return Err(SiteGenError::structural(format!("{} response was empty", stage)).into());
        }
        Ok(response.to_string())
    }

    pub async fn sitemap(&self, identity: &str) -> Result<String> {
        info!("Designing the sitemap...");
        self.ask(
            "sitemap",
            &prompts::sitemap(identity, self.site_type),
            ResponseFormat::Text,
        )
        .await
    }

    pub async fn content_strategy(&self, identity: &str, sitemap: &str) -> Result<String> {
        info!("Drafting the {} content strategy...", self.site_type);
        self.ask(
            "content strategy",
            &prompts::content_strategy(identity, sitemap, self.site_type),
            ResponseFormat::Text,
        )
        .await
    }

    pub async fn page_list(&self, identity: &str, strategy: &str) -> Result<Vec<TargetPage>> {
        info!("Extracting the target page list...");
        let response = self
            .ask(
                "page list",
                &prompts::page_list(identity, strategy, self.site_type),
                ResponseFormat::Json,
            )
            .await?;
        let pages = parse_page_list(&response)?;
        info!("  ✓ {} pages planned", pages.len());
        Ok(pages)
    }

    /// Never fails: any problem yields the default slug.
    pub async fn site_name(&self, identity: &str) -> SiteName {
        let fallback = SiteName {
            site_name: DEFAULT_SLUG.to_string(),
            slug: DEFAULT_SLUG.to_string(),
        };
        let prompt = prompts::site_name(identity, self.site_type);
        match self.client.complete_with(&prompt, ResponseFormat::Json).await {
            Ok(response) => parse_site_name(&response).unwrap_or_else(|| {
                warn!("Site name response unusable, using '{}'", DEFAULT_SLUG);
                fallback
            }),
            Err(e) => {
                warn!("Site name request failed ({:#}), using '{}'", e, DEFAULT_SLUG);
                fallback
            }
        }
    }
}
