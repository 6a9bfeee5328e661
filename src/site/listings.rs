//! Regenerates each section's listing page from the article plans.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use super::snippets::SiteSnippets;
use crate::config::AnalyticsIds;
use crate::pipeline::page::{PageContext, PageGenerator};
use crate::pipeline::plan::{navigation_pages, ArticlePlan};
use crate::pipeline::types::{section_of, TargetPage};
use crate::util::write_file;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingReport {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

/// Sections named by the plans, sorted and unique. Root files have none.
pub fn listing_sections(plans: &[ArticlePlan]) -> Vec<String> {
    plans
        .iter()
        .filter_map(|p| section_of(&p.file_name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct ListingUpdater<'a> {
    generator: &'a PageGenerator,
    identity: &'a str,
    analytics: AnalyticsIds,
    site_name: Option<&'a str>,
}

impl<'a> ListingUpdater<'a> {
    pub fn new(generator: &'a PageGenerator, identity: &'a str, analytics: AnalyticsIds) -> Self {
        Self {
            generator,
            identity,
            analytics,
            site_name: None,
        }
    }

    pub fn with_site_name(mut self, site_name: Option<&'a str>) -> Self {
        self.site_name = site_name;
        self
    }

    fn listing_page(&self, section: &str) -> TargetPage {
        let title = match self.site_name {
            Some(name) => format!("{} | {}", capitalize(section), name),
            None => capitalize(section),
        };
        TargetPage::new(
            title,
            format!("{}/index.html", section),
            format!(
                "Listing page for the \"{}\" section. Introduce every article in the section as an inviting card.",
                section
            ),
        )
    }

    /// Regenerate `<section>/index.html` for every section. A failed section
    /// is logged and the rest continue.
    pub async fn run(&self, site_dir: &Path, plans: &[ArticlePlan]) -> Result<ListingReport> {
        let snippets = SiteSnippets::load(site_dir)?;
        let mut analytics = self.analytics.clone();
        if analytics.gtm_id.is_none() {
            analytics.gtm_id = snippets.gtm_id.clone();
        }

        let nav_pages = navigation_pages(plans);

        let mut report = ListingReport::default();
        for section in listing_sections(plans) {
            let page = self.listing_page(&section);
            let prefix = format!("{}/", section);
            let entries: Vec<TargetPage> = plans
                .iter()
                .filter(|p| p.file_name.starts_with(&prefix) && !p.is_hub())
                .map(ArticlePlan::to_target_page)
                .collect();

            info!(
                "  > Regenerating listing {} ({} articles)",
                page.file_name,
                entries.len()
            );
            let ctx = PageContext::new(&page, self.identity, &nav_pages, &analytics)
                .with_snippets(snippets.header.as_deref(), snippets.footer.as_deref())
                .with_listing(&entries);

            match self.generator.generate(&ctx).await {
                Ok(html) => {
                    write_file(&site_dir.join(&page.file_name), &html)?;
                    info!("  ✓ Updated {}", page.file_name);
                    report.updated.push(page.file_name);
                }
                Err(e) => {
                    warn!("Failed to regenerate {}: {:#}", page.file_name, e);
                    report.failed.push(page.file_name);
                }
            }
        }
        Ok(report)
    }
}
