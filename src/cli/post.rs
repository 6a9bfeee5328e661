use anyhow::Result;
use std::fs;
use tracing::{info, warn};

use super::{GlobalOpts, Project};
use crate::social::bridge::SocialBridge;
use crate::social::poster::{DryRunPoster, SocialPoster, XPoster};

pub async fn run(root: String, dry_run_post: bool, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;
    let layout = &project.layout;
    let social = &project.config.social;

    if !layout.queue_file.exists() {
        println!("No post queue at {}, nothing to post", layout.queue_file.display());
        return Ok(());
    }

    let poster: Box<dyn SocialPoster> = if dry_run_post || project.dry_run {
        info!("Posting in dry-run mode");
        Box::new(DryRunPoster)
    } else {
        Box::new(XPoster::from_config(social, project.config.llm.timeout_secs)?)
    };

    let persona = match &social.persona_file {
        Some(file) => {
            let path = layout.root.join(file);
            fs::read_to_string(&path).unwrap_or_else(|e| {
                warn!("Persona file {} unreadable ({}), using default", path.display(), e);
                String::new()
            })
        }
        None => String::new(),
    };

    let client = project.planner()?;
    let report = SocialBridge::new(&client, poster.as_ref(), layout.root.join(&social.knowledge_log))
        .with_persona(persona)
        .run(&layout.queue_file)
        .await?;

    println!(
        "Processed {} queued articles: {} posted, {} failed",
        report.processed, report.posted, report.failed
    );
    Ok(())
}
