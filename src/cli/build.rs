//! `sitegen build`: statement of purpose to a complete first site.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::{
    read_answer, GlobalOpts, Project, IDENTITY_REPORT, PAGE_LIST_REPORT, SITEMAP_REPORT,
    SITE_RECORD, STRATEGY_REPORT,
};
use crate::config::AnalyticsIds;
use crate::error::SiteGenError;
use crate::llm::client::LlmClient;
use crate::pipeline::identity::IdentityGenerator;
use crate::pipeline::page::{PageContext, PageGenerator};
use crate::pipeline::plan::{save_plans, ArticlePlan};
use crate::pipeline::strategy::{parse_page_list, SiteArchitect, SiteName};
use crate::pipeline::types::{SiteRecord, SiteType, TargetPage};
use crate::site::archive::archive_site;
use crate::site::tags::TagInjector;
use crate::util::write_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub site: SiteRecord,
    pub generated: Vec<String>,
    /// Pages already on disk when resuming
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub archive: Option<PathBuf>,
}

/// Output of the planning stages.
#[derive(Debug, Clone)]
pub struct PlannedSite {
    pub record: SiteRecord,
    pub identity: String,
    pub strategy: String,
    pub pages: Vec<TargetPage>,
}

pub struct InitialBuild<'a> {
    project: &'a Project,
    planner: &'a dyn LlmClient,
    site_type: SiteType,
    resume: bool,
    analytics: AnalyticsIds,
}

impl<'a> InitialBuild<'a> {
    pub fn new(project: &'a Project, planner: &'a dyn LlmClient, site_type: SiteType) -> Self {
        Self {
            project,
            planner,
            site_type,
            resume: false,
            analytics: project.config.analytics.resolve(),
        }
    }

    /// Reuse checkpoint reports and pages already on disk.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_analytics(mut self, analytics: AnalyticsIds) -> Self {
        self.analytics = analytics;
        self
    }

    fn checkpoint(&self, name: &str) -> Option<String> {
        if !self.resume {
            return None;
        }
        let content = fs::read_to_string(self.project.layout.report(name)).ok()?;
        if content.trim().is_empty() {
            return None;
        }
        info!("  > Reusing {}", name);
        Some(content)
    }

    fn save_report(&self, name: &str, content: &str) -> Result<()> {
        write_file(&self.project.layout.report(name), content)
    }

    fn read_opinion(&self) -> Result<String> {
        let path = &self.project.layout.opinion_file;
        let raw = fs::read_to_string(path).map_err(|_| {
            SiteGenError::setup(format!("statement of purpose not found: {}", path.display()))
        })?;
        if raw.trim().is_empty() {
            return Err(SiteGenError::setup(format!("{} is empty", path.display())).into());
        }
        Ok(raw)
    }

    /// Identity, site record, sitemap, strategy and page list, each saved
    /// as a checkpoint report.
    pub async fn plan(&self) -> Result<PlannedSite> {
        let architect = SiteArchitect::new(self.planner, self.site_type);

        let identity = match self.checkpoint(IDENTITY_REPORT) {
            Some(identity) => identity,
            None => {
                let raw = self.read_opinion()?;
                let identity = IdentityGenerator::new(self.planner)
                    .generate(&raw, self.site_type)
                    .await?;
                self.save_report(IDENTITY_REPORT, &identity)?;
                identity
            }
        };

        let existing_record = self
            .checkpoint(SITE_RECORD)
            .and_then(|c| serde_json::from_str::<SiteRecord>(&c).ok());
        let record = match existing_record {
            Some(record) => record,
            None => {
                let SiteName { site_name, slug } = architect.site_name(&identity).await;
                let record = SiteRecord {
                    site_name,
                    slug,
                    site_type: self.site_type,
                };
                let json = serde_json::to_string_pretty(&record)
                    .context("Failed to serialize site record")?;
                self.save_report(SITE_RECORD, &json)?;
                record
            }
        };
        info!("Site: {} ({})", record.site_name, record.slug);

        let sitemap = match self.checkpoint(SITEMAP_REPORT) {
            Some(sitemap) => sitemap,
            None => {
                let sitemap = architect.sitemap(&identity).await?;
                self.save_report(SITEMAP_REPORT, &sitemap)?;
                sitemap
            }
        };

        let strategy = match self.checkpoint(STRATEGY_REPORT) {
            Some(strategy) => strategy,
            None => {
                let strategy = architect.content_strategy(&identity, &sitemap).await?;
                self.save_report(STRATEGY_REPORT, &strategy)?;
                strategy
            }
        };

        let pages = match self.checkpoint(PAGE_LIST_REPORT) {
            Some(list) => parse_page_list(&list)?,
            None => {
                let pages = architect.page_list(&identity, &strategy).await?;
                let json =
                    serde_json::to_string_pretty(&pages).context("Failed to serialize page list")?;
                self.save_report(PAGE_LIST_REPORT, &json)?;
                pages
            }
        };

        Ok(PlannedSite {
            record,
            identity,
            strategy,
            pages,
        })
    }

    /// Generate every planned page, then record plans, inject tags and
    /// archive the site.
    pub async fn generate(&self, planned: PlannedSite, pages_gen: &PageGenerator) -> Result<BuildReport> {
        let PlannedSite {
            record,
            identity,
            strategy,
            pages,
        } = planned;
        let layout = &self.project.layout;
        let mut report = BuildReport {
            site: record,
            generated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            archive: None,
        };

        info!("Generating {} pages...", pages.len());
        for (i, page) in pages.iter().enumerate() {
            let path = layout.site_dir.join(&page.file_name);
            if self.resume && path.exists() {
                info!("  > [{}/{}] {} exists, skipping", i + 1, pages.len(), page.file_name);
                report.skipped.push(page.file_name.clone());
                continue;
            }
            info!("  > [{}/{}] {}", i + 1, pages.len(), page.file_name);
            let ctx = PageContext::new(page, &identity, &pages, &self.analytics)
                .with_strategy(&strategy);
            match pages_gen.generate(&ctx).await {
                Ok(html) => {
                    write_file(&path, &html)?;
                    report.generated.push(page.file_name.clone());
                }
                Err(e) => {
                    warn!("Page {} failed: {:#}", page.file_name, e);
                    report.failed.push(page.file_name.clone());
                }
            }
        }

        let now = Utc::now();
        let plans: Vec<ArticlePlan> = pages
            .iter()
            .filter(|p| !report.failed.contains(&p.file_name))
            .map(|p| ArticlePlan::new(&p.file_name, &p.title, &p.purpose, now))
            .collect();
        save_plans(&layout.reports_dir, &plans)?;

        if let Err(e) = TagInjector::new(self.analytics.clone()).run(&layout.site_dir) {
            warn!("Tag injection failed: {:#}", e);
        }

        match archive_site(&layout.site_dir, &layout.root, &report.site.slug) {
            Ok(path) => report.archive = Some(path),
            Err(e) => warn!("Archive not created: {:#}", e),
        }

        info!(
            "  ✓ Build complete: {} generated, {} skipped, {} failed",
            report.generated.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// Ask for the site type until a valid answer arrives. An empty answer or
/// end of input is a setup error.
fn ask_site_type<R: BufRead>(input: &mut R) -> Result<SiteType> {
    loop {
        let answer = read_answer(input, "Site type? [1] corporate  [2] personal: ")?
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                SiteGenError::setup("no site type given; pass --site-type corporate|personal")
            })?;
        match SiteType::from_str(&answer) {
            Ok(site_type) => return Ok(site_type),
            Err(e) => eprintln!("{}", e),
        }
    }
}

pub async fn run(root: String, site_type: Option<String>, resume: bool, opts: &GlobalOpts) -> Result<()> {
    let project = Project::open(&root, opts)?;

    let site_type = match site_type {
        Some(s) => SiteType::from_str(&s)?,
        None if resume => match project.site_record() {
            Some(record) => record.site_type,
            None => ask_site_type(&mut io::stdin().lock())?,
        },
        None => ask_site_type(&mut io::stdin().lock())?,
    };
    info!("Site type: {}", site_type);

    let planner = project.planner()?;
    let build = InitialBuild::new(&project, &planner, site_type).with_resume(resume);
    let planned = build.plan().await?;
    let pages_gen = project.page_generator(site_type, Some(&planned.record.site_name))?;
    let report = build.generate(planned, &pages_gen).await?;

    println!(
        "Built {}: {} pages generated, {} skipped, {} failed",
        report.site.site_name,
        report.generated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    if let Some(archive) = &report.archive {
        println!("Archive: {}", archive.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};
    use std::io::Cursor;

    #[test]
    fn test_ask_site_type_accepts_menu_number() {
        let mut input = Cursor::new("2\n");
        assert_eq!(ask_site_type(&mut input).unwrap(), SiteType::Personal);
    }

    #[test]
    fn test_ask_site_type_asks_again_after_bad_answer() {
        let mut input = Cursor::new("blog\ncorporate\n");
        assert_eq!(ask_site_type(&mut input).unwrap(), SiteType::Corporate);
    }

    #[test]
    fn test_ask_site_type_fails_on_empty_stdin() {
        let err = ask_site_type(&mut Cursor::new("")).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Setup));

        let err = ask_site_type(&mut Cursor::new("\n")).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Setup));

        let err = ask_site_type(&mut Cursor::new("blog\n")).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Setup));
    }
}
