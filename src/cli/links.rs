use anyhow::Result;

use super::{GlobalOpts, Project};
use crate::site::links::{check_links, fix_links};

/// Print broken internal links. Returns true if every link resolves.
pub fn check(root: String, opts: &GlobalOpts) -> Result<bool> {
    let project = Project::open(&root, opts)?;
    let report = check_links(&project.layout.site_dir)?;

    if report.broken.is_empty() {
        println!(
            "All {} internal links in {} files resolve",
            report.links_checked, report.files_checked
        );
        return Ok(true);
    }

    println!("{} broken links:", report.broken.len());
    for link in &report.broken {
        println!("  {}: {} -> {}", link.source, link.href, link.target);
    }
    Ok(false)
}

pub fn fix(root: String, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;
    let modified = fix_links(&project.layout.site_dir)?;
    println!("Files modified: {}", modified);
    Ok(())
}
