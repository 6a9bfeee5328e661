use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sitegen::cli::{self, GlobalOpts};

#[derive(Parser)]
#[command(name = "sitegen", version)]
#[command(about = "Generate and grow a static website from a statement of purpose", long_about = None)]
struct Cli {
    /// Path to config file (defaults to <root>/sitegen.toml, ./sitegen.toml or ~/.config/sitegen/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override LLM model for every stage (e.g., "gemini-2.5-pro")
    #[arg(long, global = true)]
    model: Option<String>,

    /// Use mock LLM client for testing
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the initial site: identity, sitemap, strategy, pages
    Build {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        root: String,

        /// corporate (1) or personal (2). Asked interactively if omitted.
        #[arg(long)]
        site_type: Option<String>,

        /// Reuse existing reports and pages
        #[arg(long)]
        resume: bool,
    },

    /// Add articles to the weakest hub and refresh it
    Improve {
        #[arg(default_value = ".")]
        root: String,

        /// Articles to add this cycle (default: from config)
        #[arg(long)]
        articles: Option<usize>,

        /// Skip analytics tag injection after the cycle
        #[arg(long)]
        no_tags: bool,
    },

    /// Inject Google Tag Manager and AdSense snippets into every page
    InjectTags {
        #[arg(default_value = ".")]
        root: String,
    },

    /// Report internal links whose target does not exist
    CheckLinks {
        #[arg(default_value = ".")]
        root: String,
    },

    /// Repair root-level links that point above the site root
    FixLinks {
        #[arg(default_value = ".")]
        root: String,
    },

    /// Regenerate every section's listing page from the plans
    UpdateListings {
        #[arg(default_value = ".")]
        root: String,
    },

    /// Generate one planned article
    AddArticle {
        #[arg(default_value = ".")]
        root: String,

        /// Planned file name (e.g., insights/ocean-data-4.html). Chosen interactively if omitted.
        #[arg(long)]
        file: Option<String>,
    },

    /// Post queued articles to social media
    Post {
        #[arg(default_value = ".")]
        root: String,

        /// Log posts instead of publishing them
        #[arg(long)]
        dry_run_post: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let opts = GlobalOpts {
        config: cli.config,
        model: cli.model,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Build {
            root,
            site_type,
            resume,
        } => cli::build::run(root, site_type, resume, &opts).await?,
        Commands::Improve {
            root,
            articles,
            no_tags,
        } => cli::improve::run(root, articles, no_tags, &opts).await?,
        Commands::InjectTags { root } => cli::inject_tags::run(root, &opts)?,
        Commands::CheckLinks { root } => {
            if !cli::links::check(root, &opts)? {
                std::process::exit(1);
            }
        }
        Commands::FixLinks { root } => cli::links::fix(root, &opts)?,
        Commands::UpdateListings { root } => cli::update_listings::run(root, &opts).await?,
        Commands::AddArticle { root, file } => cli::add_article::run(root, file, &opts).await?,
        Commands::Post { root, dry_run_post } => cli::post::run(root, dry_run_post, &opts).await?,
    }

    Ok(())
}
