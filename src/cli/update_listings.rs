use anyhow::Result;

use super::{GlobalOpts, Project};
use crate::error::SiteGenError;
use crate::pipeline::plan::load_plans;
use crate::site::listings::ListingUpdater;

pub async fn run(root: String, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;
    let plans = load_plans(&project.layout.reports_dir)?.ok_or_else(|| {
        SiteGenError::setup(format!(
            "no article plans in {}; run `sitegen build` first",
            project.layout.reports_dir.display()
        ))
    })?;

    let identity = project.identity()?;
    let site_type = project.site_type(&identity);
    let record = project.site_record();
    let site_name = record.as_ref().map(|r| r.site_name.as_str());
    let pages = project.page_generator(site_type, site_name)?;

    let report = ListingUpdater::new(&pages, &identity, project.config.analytics.resolve())
        .with_site_name(site_name)
        .run(&project.layout.site_dir, &plans)
        .await?;

    for file in &report.updated {
        println!("  ✓ {}", file);
    }
    for file in &report.failed {
        println!("  ! {} (failed)", file);
    }
    Ok(())
}
