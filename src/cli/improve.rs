use anyhow::Result;
use tracing::info;

use super::{GlobalOpts, Project};
use crate::pipeline::improvement::ImprovementCycle;

pub async fn run(
    root: String,
    articles: Option<usize>,
    no_tags: bool,
    opts: &GlobalOpts,
) -> Result<()> {
    let mut project = Project::open(&root, opts)?;
    if let Some(n) = articles {
        info!("CLI override: articles_per_cycle = {}", n);
        project.config.generation.articles_per_cycle = n;
    }
    if no_tags {
        info!("CLI override: tag injection disabled");
        project.config.generation.inject_tags_after_cycle = false;
    }

    let identity = project.identity()?;
    let site_type = project.site_type(&identity);
    let record = project.site_record();
    let planner = project.planner()?;
    let pages = project.page_generator(site_type, record.as_ref().map(|r| r.site_name.as_str()))?;

    let report = ImprovementCycle::new(
        &planner,
        &pages,
        &project.layout,
        &project.config.generation,
        &identity,
    )
    .with_analytics(project.config.analytics.resolve())
    .with_base_url(project.config.social.site_base_url())
    .with_keywords(project.config.social.keywords.clone())
    .run()
    .await?;

    println!("Hub: {}", report.hub);
    if let Some(reason) = &report.reason {
        println!("Reason: {}", reason);
    }
    for file in &report.generated {
        println!("  + {}", file);
    }
    for file in &report.failed {
        println!("  ! {} (failed)", file);
    }
    println!(
        "{} new articles, hub {}, {} queued for posting",
        report.generated.len(),
        if report.hub_updated { "updated" } else { "unchanged" },
        report.queued
    );
    Ok(())
}
