//! Improvement cycle: pick the weakest hub, plan and write new articles for
//! it, refresh the hub, and queue the new articles for posting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::page::{PageContext, PageGenerator};
use super::plan::{
    load_plans, navigation_pages, next_article_number, save_plans, ArticlePlan, BalanceReport,
};
use super::types::{parent_dir, parent_hub, validate_file_name, TargetPage};
use crate::config::{AnalyticsIds, GenerationConfig, ProjectLayout};
use crate::error::SiteGenError;
use crate::llm::client::{LlmClient, ResponseFormat};
use crate::llm::prompts;
use crate::llm::retry::AttemptError;
use crate::llm::rotation::RotatingClient;
use crate::site::scan::{scan_site, PageDigest};
use crate::site::tags::TagInjector;
use crate::social::queue::{save_queue, PostQueueEntry};
use crate::util::{escape_html, slugify, strip_code_fence, write_file};

const FALLBACK_SUMMARY_CHARS: usize = 300;

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub hub: String,
    pub reason: Option<String>,
    pub generated: Vec<String>,
    pub failed: Vec<String>,
    pub hub_updated: bool,
    pub queued: usize,
}

/// A plan proposed by the model, before file names are normalised.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProposedArticle {
    #[serde(default)]
    pub file_name: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Deserialize)]
struct Priority {
    file_name: String,
    #[serde(default)]
    reason: String,
}

/// Parse `{file_name, reason}`.
pub fn parse_priority(response: &str) -> Option<(String, String)> {
    let priority: Priority = serde_json::from_str(strip_code_fence(response)).ok()?;
    let file_name = priority.file_name.trim().trim_start_matches('/').to_string();
    if file_name.is_empty() {
        return None;
    }
    Some((file_name, priority.reason))
}

/// Parse the article-plan array (or `{articles: [...]}`), keeping entries
/// that have a title.
pub fn parse_article_plans(response: &str) -> std::result::Result<Vec<ProposedArticle>, String> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(response))
        .map_err(|e| format!("article plans are not valid JSON: {}", e))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("articles") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err("article plans object has no `articles` array".to_string()),
        },
        _ => return Err("article plans must be a JSON array".to_string()),
    };

    let plans: Vec<ProposedArticle> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ProposedArticle>(item) {
            Ok(p) if !p.title.trim().is_empty() => Some(p),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping malformed article plan: {}", e);
                None
            }
        })
        .collect();

    if plans.is_empty() {
        return Err("no usable article plans".to_string());
    }
    Ok(plans)
}

/// `<hub dir>/<slug>-<number>.html`. The slug comes from the proposed file
/// name with any numeric suffix removed, else from the title.
pub fn article_file_name(proposed: &ProposedArticle, hub_file: &str, number: usize) -> String {
    let base = proposed
        .file_name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_end_matches(".html")
        .trim_end_matches(".htm");
    let base = match base.rsplit_once('-') {
        Some((stem, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => stem,
        _ => base,
    };
    let mut slug = slugify(base);
    if slug.is_empty() {
        slug = slugify(&proposed.title);
    }
    if slug.is_empty() {
        slug = "article".to_string();
    }

    match parent_dir(hub_file) {
        "" => format!("{}-{}.html", slug, number),
        dir => format!("{}/{}-{}.html", dir, slug, number),
    }
}

/// Hub purpose: its summary plus a link to every child article, each with
/// the article's summary.
pub fn hub_purpose(hub: &ArticlePlan, children: &[&ArticlePlan]) -> String {
    let items: String = children
        .iter()
        .map(|c| {
            let href = c.file_name.rsplit('/').next().unwrap_or(&c.file_name);
            let summary = c.summary.trim();
            if summary.is_empty() {
                format!(
                    "<li><a href=\"{}\">{}</a></li>\n",
                    escape_html(href),
                    escape_html(&c.title)
                )
            } else {
                format!(
                    "<li><a href=\"{}\">{}</a>: {}</li>\n",
                    escape_html(href),
                    escape_html(&c.title),
                    escape_html(summary)
                )
            }
        })
        .collect();
    format!(
        "{}\n\nThis hub must link to every one of its articles, using exactly these links:\n<ul>\n{}</ul>",
        hub.summary, items
    )
}

pub struct ImprovementCycle<'a> {
    planner: &'a RotatingClient,
    pages: &'a PageGenerator,
    layout: &'a ProjectLayout,
    settings: &'a GenerationConfig,
    identity: &'a str,
    analytics: AnalyticsIds,
    base_url: Option<String>,
    keywords: Vec<String>,
}

impl<'a> ImprovementCycle<'a> {
    pub fn new(
        planner: &'a RotatingClient,
        pages: &'a PageGenerator,
        layout: &'a ProjectLayout,
        settings: &'a GenerationConfig,
        identity: &'a str,
    ) -> Self {
        Self {
            planner,
            pages,
            layout,
            settings,
            identity,
            analytics: AnalyticsIds::default(),
            base_url: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_analytics(mut self, analytics: AnalyticsIds) -> Self {
        self.analytics = analytics;
        self
    }

    /// Public URL prefix for queued articles, ending in `/`.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub async fn run(&self) -> Result<CycleReport> {
        let now = Utc::now();
        let mut plans = self.load_or_scan_plans(now).await?;

        let balance = BalanceReport::compute(&plans, &self.settings.excluded_sections);
        debug!("Hub balance:\n{}", balance.to_markdown());
        if balance.entries.is_empty() {
            return Err(SiteGenError::structural("no hub pages to extend").into());
        }

        let (hub_file, reason) = self.choose_hub(&plans, &balance).await;
        info!("Priority hub: {}", hub_file);
        let Some(hub) = plans.iter().find(|p| p.file_name == hub_file).cloned() else {
            return Err(SiteGenError::structural(format!("hub {} has no plan", hub_file)).into());
        };

        let start = next_article_number(plans.iter().map(|p| p.file_name.as_str()));
        let proposals = self.plan_articles(&hub, start).await?;

        let nav_pages = navigation_pages(&plans);
        let published = now.format("%Y-%m-%d").to_string();

        let mut report = CycleReport {
            hub: hub_file.clone(),
            reason,
            ..CycleReport::default()
        };
        let mut new_plans = Vec::new();

        for (offset, proposed) in proposals.iter().enumerate() {
            let file_name = article_file_name(proposed, &hub_file, start + offset);
            if let Err(e) = validate_file_name(&file_name) {
                warn!("Skipping planned article '{}': {}", proposed.title, e);
                report.failed.push(file_name);
                continue;
            }
            let plan = ArticlePlan::new(&file_name, &proposed.title, &proposed.summary, now);
            let page = plan.to_target_page();
            let ctx = PageContext::new(&page, self.identity, &nav_pages, &self.analytics)
                .with_published(&published);

            match self.pages.generate(&ctx).await {
                Ok(html) => {
                    write_file(&self.layout.site_dir.join(&file_name), &html)?;
                    info!("  ✓ Wrote {}", file_name);
                    report.generated.push(file_name);
                    new_plans.push(plan);
                }
                Err(e) => {
                    warn!("Article {} failed, leaving it out of the plan: {:#}", file_name, e);
                    report.failed.push(file_name);
                }
            }
        }
        plans.extend(new_plans.iter().cloned());

        if !new_plans.is_empty() {
            let nav_pages = navigation_pages(&plans);
            report.hub_updated = self.refresh_hub(&mut plans, &hub_file, &nav_pages, now).await?;
        }

        save_plans(&self.layout.reports_dir, &plans)?;
        report.queued = self.write_post_queue(&new_plans)?;

        if self.settings.inject_tags_after_cycle {
            if let Err(e) = TagInjector::new(self.analytics.clone()).run(&self.layout.site_dir) {
                warn!("Tag injection after cycle failed: {:#}", e);
            }
        }

        info!(
            "Cycle complete: {} new articles in {} ({} failed)",
            report.generated.len(),
            report.hub,
            report.failed.len()
        );
        Ok(report)
    }

    async fn load_or_scan_plans(&self, now: DateTime<Utc>) -> Result<Vec<ArticlePlan>> {
        if let Some(plans) = load_plans(&self.layout.reports_dir)? {
            info!("Loaded {} article plans", plans.len());
            return Ok(plans);
        }

        info!("No article plans found; scanning {}", self.layout.site_dir.display());
        let digests = scan_site(&self.layout.site_dir)?;
        let mut plans = Vec::with_capacity(digests.len());
        for digest in digests {
            let summary = self.summarize(&digest).await;
            plans.push(ArticlePlan::new(
                &digest.file_name,
                &digest.title,
                summary,
                now,
            ));
        }
        Ok(plans)
    }

    async fn summarize(&self, digest: &PageDigest) -> String {
        let prompt =
            prompts::page_summary(&digest.title, &digest.headings, &digest.excerpt, self.identity);
        match self.planner.complete(&prompt).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) | Err(_) => {
                debug!("Using excerpt as summary for {}", digest.file_name);
                digest.excerpt.chars().take(FALLBACK_SUMMARY_CHARS).collect()
            }
        }
    }

    /// Ask the model for the priority hub. An unknown or missing answer
    /// falls back to the configured hub, then to the first hub.
    async fn choose_hub(
        &self,
        plans: &[ArticlePlan],
        balance: &BalanceReport,
    ) -> (String, Option<String>) {
        let hubs: String = balance
            .entries
            .iter()
            .map(|(hub, _)| {
                let title = plans
                    .iter()
                    .find(|p| &p.file_name == hub)
                    .map(|p| p.title.as_str())
                    .unwrap_or_default();
                format!("- {} ({})\n", hub, title)
            })
            .collect();
        let prompt = prompts::priority_section(self.identity, &balance.to_markdown(), &hubs);

        match self.planner.complete_with(&prompt, ResponseFormat::Json).await {
            Ok(response) => match parse_priority(&response) {
                Some((file, reason)) if balance.count(&file).is_some() => {
                    return (file, Some(reason));
                }
                Some((file, _)) => warn!("Model picked unknown hub {}", file),
                None => warn!("Priority response unusable"),
            },
            Err(e) => warn!("Priority request failed: {:#}", e),
        }

        let fallback = &self.settings.fallback_hub;
        if balance.count(fallback).is_some() {
            (fallback.clone(), None)
        } else {
            (balance.entries[0].0.clone(), None)
        }
    }

    async fn plan_articles(&self, hub: &ArticlePlan, start: usize) -> Result<Vec<ProposedArticle>> {
        let count = self.settings.articles_per_cycle.max(1);
        info!(
            "Planning {} articles for {} starting at {}",
            count, hub.file_name, start
        );
        let prompt = prompts::article_plans(
            &hub.title,
            &hub.file_name,
            &hub.summary,
            self.identity,
            count,
            start,
        );
        let policy = self.settings.planning_retry_policy();

        let mut proposals = policy
            .run(self.planner, "article plans", |_attempt| {
                let prompt = &prompt;
                async move {
                    let response = self
                        .planner
                        .complete_with(prompt, ResponseFormat::Json)
                        .await
                        .map_err(AttemptError::Request)?;
                    parse_article_plans(&response).map_err(AttemptError::Output)
                }
            })
            .await?;
        proposals.truncate(count);
        Ok(proposals)
    }

    /// Regenerate the hub so it links every child. Returns whether it was written.
    async fn refresh_hub(
        &self,
        plans: &mut [ArticlePlan],
        hub_file: &str,
        nav_pages: &[TargetPage],
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(hub) = plans.iter().find(|p| p.file_name == hub_file).cloned() else {
            return Ok(false);
        };
        let children: Vec<&ArticlePlan> = plans
            .iter()
            .filter(|p| !p.is_hub() && parent_hub(&p.file_name) == hub_file)
            .collect();
        let page = TargetPage::new(&hub.title, &hub.file_name, hub_purpose(&hub, &children));

        info!("Refreshing hub {} ({} articles)", hub_file, children.len());
        let ctx = PageContext::new(&page, self.identity, nav_pages, &self.analytics);
        match self.pages.generate(&ctx).await {
            Ok(html) => {
                write_file(&self.layout.site_dir.join(hub_file), &html)?;
                if let Some(plan) = plans.iter_mut().find(|p| p.file_name == hub_file) {
                    plan.updated_at = Some(now);
                }
                info!("  ✓ Updated {}", hub_file);
                Ok(true)
            }
            Err(e) => {
                warn!("Hub {} not refreshed: {:#}", hub_file, e);
                Ok(false)
            }
        }
    }

    /// Overwrite the post queue with this cycle's articles.
    fn write_post_queue(&self, new_plans: &[ArticlePlan]) -> Result<usize> {
        if self.base_url.is_none() && !new_plans.is_empty() {
            warn!("No public site URL configured; queued URLs are site-relative");
        }
        let entries: Vec<PostQueueEntry> = new_plans
            .iter()
            .map(|plan| PostQueueEntry {
                theme: plan.title.clone(),
                keywords: self.keywords.clone(),
                main_url: format!(
                    "{}{}",
                    self.base_url.as_deref().unwrap_or_default(),
                    plan.file_name
                ),
                provided_summary: plan.summary.clone(),
            })
            .collect();
        save_queue(&self.layout.queue_file, &entries)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn proposed(file: &str, title: &str) -> ProposedArticle {
        ProposedArticle {
            file_name: file.to_string(),
            title: title.to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_article_file_name() {
        assert_eq!(
            article_file_name(&proposed("ocean-data-3.html", "x"), "insights/index.html", 13),
            "insights/ocean-data-13.html"
        );
        assert_eq!(
            article_file_name(&proposed("", "Why Tides Matter"), "insights/index.html", 4),
            "insights/why-tides-matter-4.html"
        );
        assert_eq!(
            article_file_name(&proposed("other/web3.html", "x"), "index.html", 2),
            "web3-2.html"
        );
        assert_eq!(
            article_file_name(&proposed("", "???"), "a/b/index.html", 1),
            "a/b/article-1.html"
        );
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(
            parse_priority(r#"{"file_name": "/insights/index.html", "reason": "thin"}"#),
            Some(("insights/index.html".to_string(), "thin".to_string()))
        );
        assert_eq!(parse_priority("not json"), None);
        assert_eq!(parse_priority(r#"{"file_name": ""}"#), None);
    }

    #[test]
    fn test_parse_article_plans_shapes() {
        let plans = parse_article_plans(
            "```json\n{\"articles\": [{\"file_name\": \"a-1.html\", \"title\": \"A\"}, {\"title\": \"\"}, {\"nope\": 1}]}\n```",
        )
        .unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, "A");

        assert!(parse_article_plans("[]").is_err());
        assert!(parse_article_plans("{\"x\": 1}").is_err());
        assert!(parse_article_plans("oops").is_err());
    }

    #[test]
    fn test_hub_purpose_links_children_by_basename() {
        let hub = ArticlePlan::new("insights/index.html", "Insights", "All insights.", Utc::now());
        let a = ArticlePlan::new("insights/a-1.html", "A & B", "", Utc::now());
        let b = ArticlePlan::new("insights/c-2.html", "C", "Kelp <forests>", Utc::now());
        let purpose = hub_purpose(&hub, &[&a, &b]);
        assert!(purpose.starts_with("All insights."));
        assert!(purpose.contains("<li><a href=\"a-1.html\">A &amp; B</a></li>"));
        assert!(purpose.contains("<li><a href=\"c-2.html\">C</a>: Kelp &lt;forests&gt;</li>"));
    }
}
