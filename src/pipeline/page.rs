//! Full-page HTML generation.

use anyhow::Result;
use tracing::info;

use super::extract::extract_html;
use super::listing::{fill_listing_slot, render_listing_grid};
use super::navigation::navigation_block;
use super::types::{SiteType, TargetPage};
use crate::config::AnalyticsIds;
use crate::llm::client::LlmClient;
use crate::llm::prompts::{self, PagePrompt};
use crate::llm::retry::{AttemptError, RetryPolicy};
use crate::llm::rotation::RotatingClient;

/// Inputs for one page.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub page: &'a TargetPage,
    pub identity: &'a str,
    pub strategy: Option<&'a str>,
    pub nav_pages: &'a [TargetPage],
    pub analytics: &'a AnalyticsIds,
    /// Publication date shown on articles
    pub published: Option<&'a str>,
    pub header_snippet: Option<&'a str>,
    pub footer_snippet: Option<&'a str>,
    /// Entries for the card grid; `Some` makes this a listing page
    pub listing: Option<&'a [TargetPage]>,
}

impl<'a> PageContext<'a> {
    pub fn new(
        page: &'a TargetPage,
        identity: &'a str,
        nav_pages: &'a [TargetPage],
        analytics: &'a AnalyticsIds,
    ) -> Self {
        Self {
            page,
            identity,
            strategy: None,
            nav_pages,
            analytics,
            published: None,
            header_snippet: None,
            footer_snippet: None,
            listing: None,
        }
    }

    pub fn with_strategy(mut self, strategy: &'a str) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_published(mut self, date: &'a str) -> Self {
        self.published = Some(date);
        self
    }

    pub fn with_snippets(mut self, header: Option<&'a str>, footer: Option<&'a str>) -> Self {
        self.header_snippet = header;
        self.footer_snippet = footer;
        self
    }

    pub fn with_listing(mut self, entries: &'a [TargetPage]) -> Self {
        self.listing = Some(entries);
        self
    }
}

pub struct PageGenerator {
    client: RotatingClient,
    policy: RetryPolicy,
    site_type: SiteType,
    owner_name: Option<String>,
}

impl PageGenerator {
    pub fn new(client: RotatingClient, site_type: SiteType) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            site_type,
            owner_name: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_owner_name(mut self, owner: Option<String>) -> Self {
        self.owner_name = owner;
        self
    }

    pub fn site_type(&self) -> SiteType {
        self.site_type
    }

    /// What the page body should contain, by page kind.
    pub fn content_role(&self, page: &TargetPage) -> String {
        if self.site_type == SiteType::Personal && page.file_name == "projects/index.html" {
            return "This is the projects page. Never invent projects or case studies. \
Show a short message that projects are being prepared and will be added over time, \
and an empty placeholder layout the owner can later fill with real work."
                .to_string();
        }
        if page.is_hub() {
            format!(
                "This is a hub page (table of contents). Serve its purpose ({}) with a deep logical structure and concrete writing.",
                page.purpose
            )
        } else {
            format!(
                "This is a detail article. Serve its purpose ({}) with a deep logical structure and concrete, evidence-based writing.",
                page.purpose
            )
        }
    }

    fn footer_rule(&self) -> String {
        match (self.site_type, &self.owner_name) {
            (SiteType::Corporate, _) => {
                "The copyright notice uses the organisation name defined in the identity.".to_string()
            }
            (SiteType::Personal, Some(owner)) => {
                format!("The copyright notice reads \"{}\".", owner)
            }
            (SiteType::Personal, None) => {
                "The copyright notice uses the person's name from the identity.".to_string()
            }
        }
    }

    pub fn build_prompt(&self, ctx: &PageContext<'_>) -> String {
        let navigation = navigation_block(&ctx.page.file_name, ctx.nav_pages);
        let content_role = self.content_role(ctx.page);
        let footer_rule = self.footer_rule();
        prompts::page_html(&PagePrompt {
            site_type: self.site_type,
            title: &ctx.page.title,
            file_name: &ctx.page.file_name,
            purpose: &ctx.page.purpose,
            identity: ctx.identity,
            strategy: ctx.strategy,
            navigation: &navigation,
            content_role: &content_role,
            footer_rule: &footer_rule,
            analytics: ctx.analytics,
            article_date: ctx.published,
            header_snippet: ctx.header_snippet,
            footer_snippet: ctx.footer_snippet,
            listing: ctx.listing.is_some(),
        })
    }

    /// Generate the complete document for one page. Exhausting the retry
    /// policy is a transient error.
    pub async fn generate(&self, ctx: &PageContext<'_>) -> Result<String> {
        let prompt = self.build_prompt(ctx);
        let file_name = ctx.page.file_name.as_str();
        let max_attempts = self.policy.max_attempts;

        let html = self
            .policy
            .run(&self.client, &format!("page {}", file_name), |attempt| {
                let prompt = &prompt;
                async move {
                    info!(
                        "  > Generating HTML (attempt {}/{}) for {}",
                        attempt, max_attempts, file_name
                    );
                    let response = self
                        .client
                        .complete(prompt)
                        .await
                        .map_err(AttemptError::Request)?;
                    extract_html(&response).ok_or_else(|| {
                        AttemptError::Output("no complete HTML document in response".to_string())
                    })
                }
            })
            .await?;

        Ok(match ctx.listing {
            Some(entries) => {
                let grid = render_listing_grid(entries, file_name);
                fill_listing_slot(&html, &grid)
            }
            None => html,
        })
    }
}
