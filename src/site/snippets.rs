//! Shared header, footer and Tag Manager ID, read from the site's root page.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

static HEADER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<header\b.*?>.*?</header>").ok());
static FOOTER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<footer\b.*?>.*?</footer>").ok());
static GTM_ID: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"GTM-[A-Z0-9]+").ok());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSnippets {
    pub header: Option<String>,
    pub footer: Option<String>,
    pub gtm_id: Option<String>,
}

fn first_match(re: &Lazy<Option<Regex>>, html: &str) -> Option<String> {
    re.as_ref()?.find(html).map(|m| m.as_str().to_string())
}

impl SiteSnippets {
    pub fn from_html(html: &str) -> Self {
        Self {
            header: first_match(&HEADER, html),
            footer: first_match(&FOOTER, html),
            gtm_id: first_match(&GTM_ID, html),
        }
    }

    /// Read from `<site_dir>/index.html`. A missing root page yields empty
    /// snippets.
    pub fn load(site_dir: &Path) -> Result<Self> {
        let path = site_dir.join("index.html");
        if !path.exists() {
            warn!("{} not found; pages will not reuse header or footer", path.display());
            return Ok(Self::default());
        }
        let html = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let snippets = Self::from_html(&html);
        debug!(
            "Root page snippets: header={}, footer={}, gtm={:?}",
            snippets.header.is_some(),
            snippets.footer.is_some(),
            snippets.gtm_id
        );
        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::write_file;
    use tempfile::TempDir;

    const ROOT: &str = r#"<html><head><script>(function(){})(window,document,'script','dataLayer','GTM-AB12CD');</script></head>
<body><HEADER class="top"><nav><a href="index.html">Home</a></nav></HEADER>
<main>x</main>
<footer class="bottom">
<p>&copy; Ocean Works</p>
</footer></body></html>"#;

    #[test]
    fn test_from_html() {
        let snippets = SiteSnippets::from_html(ROOT);
        assert_eq!(
            snippets.header.as_deref(),
            Some(r#"<HEADER class="top"><nav><a href="index.html">Home</a></nav></HEADER>"#)
        );
        assert!(snippets.footer.unwrap().contains("Ocean Works"));
        assert_eq!(snippets.gtm_id.as_deref(), Some("GTM-AB12CD"));
    }

    #[test]
    fn test_page_without_snippets() {
        assert_eq!(SiteSnippets::from_html("<p>bare</p>"), SiteSnippets::default());
    }

    #[test]
    fn test_load_missing_root_page() {
        let dir = TempDir::new().unwrap();
        assert_eq!(SiteSnippets::load(dir.path()).unwrap(), SiteSnippets::default());

        write_file(&dir.path().join("index.html"), ROOT).unwrap();
        assert!(SiteSnippets::load(dir.path()).unwrap().header.is_some());
    }
}
