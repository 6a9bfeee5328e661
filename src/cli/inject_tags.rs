use anyhow::Result;

use super::{GlobalOpts, Project};
use crate::site::tags::TagInjector;

pub fn run(root: String, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;
    let ids = project.config.analytics.resolve();
    let report = TagInjector::new(ids).run(&project.layout.site_dir)?;
    println!(
        "Processed {} files ({} updated), skipped {}",
        report.processed, report.written, report.skipped
    );
    Ok(())
}
