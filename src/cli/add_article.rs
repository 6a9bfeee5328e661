//! `sitegen add-article`: generate one planned article on demand.

use anyhow::{bail, Result};
use chrono::Utc;
use std::path::Path;
use tracing::info;

use super::{parse_choice, prompt_line, GlobalOpts, Project};
use crate::config::AnalyticsIds;
use crate::error::SiteGenError;
use crate::pipeline::page::{PageContext, PageGenerator};
use crate::pipeline::plan::{load_plans, navigation_pages, save_plans, ArticlePlan};
use crate::pipeline::types::section_of;
use crate::site::listings::listing_sections;
use crate::site::snippets::SiteSnippets;
use crate::util::write_file;

/// Detail articles in `section`, each with whether its file exists yet.
pub fn article_status<'p>(
    site_dir: &Path,
    plans: &'p [ArticlePlan],
    section: &str,
) -> Vec<(&'p ArticlePlan, bool)> {
    plans
        .iter()
        .filter(|p| !p.is_hub() && section_of(&p.file_name) == Some(section))
        .map(|p| (p, site_dir.join(&p.file_name).exists()))
        .collect()
}

/// Generate `file_name` from its plan and write it into the site.
pub async fn add_article(
    site_dir: &Path,
    reports_dir: &Path,
    pages: &PageGenerator,
    identity: &str,
    analytics: &AnalyticsIds,
    plans: &mut [ArticlePlan],
    file_name: &str,
) -> Result<()> {
    let Some(index) = plans.iter().position(|p| p.file_name == file_name) else {
        bail!("{} is not in the article plans", file_name);
    };
    let page = plans[index].to_target_page();
    let nav_pages = navigation_pages(plans);

    let snippets = SiteSnippets::load(site_dir)?;
    let mut analytics = analytics.clone();
    if analytics.gtm_id.is_none() {
        analytics.gtm_id = snippets.gtm_id.clone();
    }
    let published = Utc::now().format("%Y-%m-%d").to_string();

    let ctx = PageContext::new(&page, identity, &nav_pages, &analytics)
        .with_published(&published)
        .with_snippets(snippets.header.as_deref(), snippets.footer.as_deref());
    let html = pages.generate(&ctx).await?;

    let path = site_dir.join(file_name);
    let existed = path.exists();
    write_file(&path, &html)?;
    info!("  ✓ Wrote {}", file_name);

    if existed {
        plans[index].updated_at = Some(Utc::now());
        save_plans(reports_dir, plans)?;
    }
    Ok(())
}

fn choose_interactively(site_dir: &Path, plans: &[ArticlePlan]) -> Result<String> {
    let sections = listing_sections(plans);
    if sections.is_empty() {
        bail!("the plans contain no sections");
    }
    for (i, section) in sections.iter().enumerate() {
        println!("  [{}] {}", i + 1, section);
    }
    let Some(section) = parse_choice(&prompt_line("Section: ")?, sections.len()) else {
        bail!("invalid section choice");
    };

    let articles = article_status(site_dir, plans, &sections[section]);
    if articles.is_empty() {
        bail!("no articles planned in {}", sections[section]);
    }
    for (i, (plan, exists)) in articles.iter().enumerate() {
        let status = if *exists { "generated" } else { "pending" };
        println!("  [{}] {} ({}) [{}]", i + 1, plan.title, plan.file_name, status);
    }
    let Some(article) = parse_choice(&prompt_line("Article: ")?, articles.len()) else {
        bail!("invalid article choice");
    };
    Ok(articles[article].0.file_name.clone())
}

pub async fn run(root: String, file: Option<String>, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;
    let layout = &project.layout;
    let mut plans = load_plans(&layout.reports_dir)?.ok_or_else(|| {
        SiteGenError::setup(format!(
            "no article plans in {}; run `sitegen build` first",
            layout.reports_dir.display()
        ))
    })?;

    let file_name = match file {
        Some(f) => f.trim().trim_start_matches('/').to_string(),
        None => choose_interactively(&layout.site_dir, &plans)?,
    };

    let identity = project.identity()?;
    let site_type = project.site_type(&identity);
    let record = project.site_record();
    let pages = project.page_generator(site_type, record.as_ref().map(|r| r.site_name.as_str()))?;

    add_article(
        &layout.site_dir,
        &layout.reports_dir,
        &pages,
        &identity,
        &project.config.analytics.resolve(),
        &mut plans,
        &file_name,
    )
    .await?;
    println!("Generated {}", file_name);
    Ok(())
}
