pub mod add_article;
pub mod build;
pub mod improve;
pub mod inject_tags;
pub mod links;
pub mod post;
pub mod update_listings;

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{Config, ProjectLayout};
use crate::error::SiteGenError;
use crate::llm::factory;
use crate::llm::rotation::RotatingClient;
use crate::pipeline::page::PageGenerator;
use crate::pipeline::types::{SiteRecord, SiteType};

pub const IDENTITY_REPORT: &str = "01_identity.md";
pub const SITEMAP_REPORT: &str = "02_sitemap.md";
pub const STRATEGY_REPORT: &str = "03_content_strategy.md";
pub const PAGE_LIST_REPORT: &str = "04_target_pages_list.json";
pub const SITE_RECORD: &str = "site.json";

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config: Option<String>,
    pub model: Option<String>,
    pub dry_run: bool,
}

/// Loaded configuration plus resolved paths for one project root.
pub struct Project {
    pub config: Config,
    pub layout: ProjectLayout,
    pub dry_run: bool,
}

impl Project {
    /// Config comes from `--config`, else `<root>/sitegen.toml`, else the
    /// usual search path.
    pub fn open(root: &str, opts: &GlobalOpts) -> Result<Self> {
        let root = Path::new(root);
        let config_path = opts.config.clone().or_else(|| {
            let local = root.join("sitegen.toml");
            local.exists().then(|| local.to_string_lossy().into_owned())
        });
        let mut config = Config::load_with_path(config_path)?;

        if let Some(ref model) = opts.model {
            info!("CLI override: model = {}", model);
            config.llm.model = model.clone();
            config.llm.page_model = Some(model.clone());
        }

        let layout = config.project.layout(root);
        info!("Project root: {}", layout.root.display());
        if opts.dry_run {
            info!("Dry run: using mock LLM client");
        }
        Ok(Self {
            config,
            layout,
            dry_run: opts.dry_run,
        })
    }

    pub fn with_config(config: Config, root: &Path, dry_run: bool) -> Self {
        let layout = config.project.layout(root);
        Self {
            config,
            layout,
            dry_run,
        }
    }

    pub fn planner(&self) -> Result<RotatingClient> {
        factory::create_client(&self.config.llm, self.dry_run)
    }

    pub fn page_generator(&self, site_type: SiteType, site_name: Option<&str>) -> Result<PageGenerator> {
        let client = factory::create_page_client(&self.config.llm, self.dry_run)?;
        let generation = &self.config.generation;
        let owner = generation
            .owner_name
            .clone()
            .or_else(|| site_name.map(str::to_string));
        Ok(PageGenerator::new(client, site_type)
            .with_retry_policy(generation.page_retry_policy())
            .with_owner_name(owner))
    }

    /// The identity written by the initial build.
    pub fn identity(&self) -> Result<String> {
        let path = self.layout.report(IDENTITY_REPORT);
        let identity = fs::read_to_string(&path).map_err(|_| {
            SiteGenError::setup(format!(
                "identity not found at {}; run `sitegen build` first",
                path.display()
            ))
        })?;
        if identity.trim().is_empty() {
            return Err(SiteGenError::setup(format!("identity at {} is empty", path.display())).into());
        }
        Ok(identity)
    }

    pub fn site_record(&self) -> Option<SiteRecord> {
        let path = self.layout.report(SITE_RECORD);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Site type from the site record, else inferred from the identity.
    pub fn site_type(&self, identity: &str) -> SiteType {
        match self.site_record() {
            Some(record) => record.site_type,
            None => {
                let inferred = SiteType::infer_from_identity(identity);
                info!("No site record; inferred site type: {}", inferred);
                inferred
            }
        }
    }
}

/// Print `question` and read one trimmed line from `input`. `None` at end
/// of input.
pub fn read_answer<R: BufRead>(input: &mut R, question: &str) -> Result<Option<String>> {
    print!("{}", question);
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok((read > 0).then(|| line.trim().to_string()))
}

/// Print `question` and read one trimmed line from stdin. End of input
/// reads as an empty answer.
pub fn prompt_line(question: &str) -> Result<String> {
    Ok(read_answer(&mut io::stdin().lock(), question)?.unwrap_or_default())
}

/// Parse a 1-based menu choice.
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("x", 3), None);
    }

    #[test]
    fn test_read_answer_trims_and_detects_eof() {
        let mut input = io::Cursor::new(" 2 \n");
        assert_eq!(read_answer(&mut input, "").unwrap().as_deref(), Some("2"));
        assert_eq!(read_answer(&mut input, "").unwrap(), None);
    }

    #[test]
    fn test_missing_identity_is_setup_error() {
        let dir = TempDir::new().unwrap();
        let project = Project::with_config(Config::default(), dir.path(), true);
        let err = project.identity().unwrap_err();
        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::Setup)
        );
    }

    #[test]
    fn test_site_type_prefers_record() {
        let dir = TempDir::new().unwrap();
        let project = Project::with_config(Config::default(), dir.path(), true);
        assert_eq!(project.site_type("corporate purpose"), SiteType::Corporate);

        let record = SiteRecord {
            site_name: "Lou".to_string(),
            slug: "lou".to_string(),
            site_type: SiteType::Personal,
        };
        write_file(
            &project.layout.report(SITE_RECORD),
            &serde_json::to_string(&record).unwrap(),
        )
        .unwrap();
        assert_eq!(project.site_type("corporate purpose"), SiteType::Personal);
    }
}
