// Initial build: planning stages, page generation, checkpoints and resume
use async_trait::async_trait;
use sitegen::cli::build::InitialBuild;
use sitegen::cli::{Project, IDENTITY_REPORT, PAGE_LIST_REPORT, SITEMAP_REPORT, SITE_RECORD};
use sitegen::config::{AnalyticsIds, Config};
use sitegen::error::{error_kind, ErrorKind};
use sitegen::llm::client::{LlmClient, MockLlmClient, ResponseFormat};
use sitegen::llm::retry::RetryPolicy;
use sitegen::llm::rotation::RotatingClient;
use sitegen::pipeline::page::PageGenerator;
use sitegen::pipeline::plan::load_plans;
use sitegen::pipeline::types::{SiteRecord, SiteType};
use sitegen::util::write_file;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const OPINION: &str = "We are a small company working on ocean conservation. \
We restore kelp forests and publish open data about coastal water quality.";

const TWO_PAGES: &str = r#"[
  {"title": "Home", "file_name": "index.html", "purpose": "Introduce the mission"},
  {"title": "Vision", "file_name": "vision/index.html", "purpose": "Explain the long-term vision"}
]"#;

/// Answers stages by task header; everything else goes to the mock client.
struct Scripted {
    rules: Vec<(&'static str, String)>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn new(rules: Vec<(&'static str, String)>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                rules,
                prompts: prompts.clone(),
            },
            prompts,
        )
    }
}

#[async_trait]
impl LlmClient for Scripted {
    async fn complete_with(&self, prompt: &str, format: ResponseFormat) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        for (header, response) in &self.rules {
            if prompt.contains(header) {
                return Ok(response.clone());
            }
        }
        MockLlmClient::new().complete_with(prompt, format).await
    }
}

fn corporate_rules(page_list: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "## Task: Brand identity",
            "## Corporate Identity\n**Purpose:** Restore the oceans.\n**Vision:** Clear coastal water."
                .to_string(),
        ),
        (
            "## Task: Site name",
            r#"{"site_name": "Blue Tide", "slug": "Blue Tide!"}"#.to_string(),
        ),
        ("## Task: Page list", page_list.to_string()),
    ]
}

fn page_generator() -> PageGenerator {
    PageGenerator::new(
        RotatingClient::single(Box::new(MockLlmClient::new())),
        SiteType::Corporate,
    )
    .with_retry_policy(RetryPolicy {
        delay: Duration::ZERO,
        ..RetryPolicy::default()
    })
}

fn project(dir: &TempDir) -> Project {
    write_file(&dir.path().join("config/opinion.txt"), OPINION).unwrap();
    Project::with_config(Config::default(), dir.path(), false)
}

#[tokio::test]
async fn test_corporate_build_end_to_end() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);
    let (planner, prompts) = Scripted::new(corporate_rules(TWO_PAGES));

    let build = InitialBuild::new(&project, &planner, SiteType::Corporate)
        .with_analytics(AnalyticsIds::default());
    let planned = build.plan().await.unwrap();
    assert_eq!(planned.pages.len(), 2);
    assert_eq!(planned.record.slug, "blue-tide");

    let report = build.generate(planned, &page_generator()).await.unwrap();
    assert_eq!(report.generated, vec!["index.html", "vision/index.html"]);
    assert!(report.failed.is_empty());

    let sitemap_prompt = prompts
        .lock()
        .unwrap()
        .iter()
        .find(|p| p.contains("## Task: Sitemap"))
        .cloned()
        .unwrap();
    assert!(sitemap_prompt.contains("VISION, SOLUTIONS, INSIGHTS, COLLABORATION, CONTACT"));

    let layout = &project.layout;
    for report_file in [IDENTITY_REPORT, SITEMAP_REPORT, PAGE_LIST_REPORT, SITE_RECORD] {
        assert!(layout.report(report_file).exists(), "missing {}", report_file);
    }
    let record: SiteRecord =
        serde_json::from_str(&fs::read_to_string(layout.report(SITE_RECORD)).unwrap()).unwrap();
    assert_eq!(record.site_type, SiteType::Corporate);

    let vision = fs::read_to_string(layout.site_dir.join("vision/index.html")).unwrap();
    assert!(vision.starts_with("<!DOCTYPE html>"));
    assert!(vision.contains("<title>Vision</title>"));

    let plans = load_plans(&layout.reports_dir).unwrap().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[1].summary, "Explain the long-term vision");

    assert_eq!(report.archive, Some(dir.path().join("blue-tide_site.zip")));
    assert!(dir.path().join("blue-tide_site.zip").exists());
}

#[tokio::test]
async fn test_resume_reuses_checkpoints_and_pages() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);
    let (planner, _) = Scripted::new(corporate_rules(TWO_PAGES));
    let build = InitialBuild::new(&project, &planner, SiteType::Corporate)
        .with_analytics(AnalyticsIds::default());
    let planned = build.plan().await.unwrap();
    build.generate(planned, &page_generator()).await.unwrap();

    let (planner, prompts) = Scripted::new(corporate_rules(TWO_PAGES));
    let resumed = InitialBuild::new(&project, &planner, SiteType::Corporate)
        .with_analytics(AnalyticsIds::default())
        .with_resume(true);
    let planned = resumed.plan().await.unwrap();
    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(planned.record.site_name, "Blue Tide");

    let report = resumed.generate(planned, &page_generator()).await.unwrap();
    assert!(report.generated.is_empty());
    assert_eq!(report.skipped.len(), 2);
}

#[tokio::test]
async fn test_empty_page_list_aborts_build() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);
    let (planner, _) = Scripted::new(corporate_rules("[]"));

    let err = InitialBuild::new(&project, &planner, SiteType::Corporate)
        .plan()
        .await
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Structural));
    assert!(!project.layout.site_dir.exists());
}

#[tokio::test]
async fn test_missing_opinion_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let project = Project::with_config(Config::default(), dir.path(), false);
    let (planner, prompts) = Scripted::new(corporate_rules(TWO_PAGES));

    let err = InitialBuild::new(&project, &planner, SiteType::Corporate)
        .plan()
        .await
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Setup));
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_personal_sitemap_labels() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);
    let (planner, prompts) = Scripted::new(corporate_rules(TWO_PAGES));

    InitialBuild::new(&project, &planner, SiteType::Personal)
        .plan()
        .await
        .unwrap();
    let prompts = prompts.lock().unwrap();
    let sitemap = prompts.iter().find(|p| p.contains("## Task: Sitemap")).unwrap();
    assert!(sitemap.contains("ABOUT, PHILOSOPHY, PROJECTS, INSIGHTS, CONTACT"));
}
