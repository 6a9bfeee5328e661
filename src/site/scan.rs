//! Walking and summarising the generated site.

use anyhow::{anyhow, Context, Result};
use ignore::WalkBuilder;
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SiteGenError;

const EXCERPT_CHARS: usize = 600;

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

/// Every `.html`/`.htm` file under `site_dir`, sorted by path.
/// A missing directory is a setup error.
pub fn html_files(site_dir: &Path) -> Result<Vec<PathBuf>> {
    if !site_dir.is_dir() {
        return Err(SiteGenError::setup(format!(
            "site directory not found: {}",
            site_dir.display()
        ))
        .into());
    }

    let walker = WalkBuilder::new(site_dir)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_html(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Site-relative, forward-slash name of `path`.
pub fn relative_name(site_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(site_dir).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// What the cycle needs to know about an existing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDigest {
    pub file_name: String,
    pub title: String,
    pub headings: Vec<String>,
    pub excerpt: String,
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn digest_page(file_name: &str, html: &str) -> Result<PageDigest> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&selector("title")?)
        .next()
        .map(|t| collapse_whitespace(t.text()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file_name.to_string());

    let headings = doc
        .select(&selector("h1, h2, h3")?)
        .map(|h| collapse_whitespace(h.text()))
        .filter(|h| !h.is_empty())
        .collect();

    let body_text = doc
        .select(&selector("main p, article p, body p")?)
        .map(|p| collapse_whitespace(p.text()))
        .collect::<Vec<_>>()
        .join(" ");
    let excerpt = body_text.chars().take(EXCERPT_CHARS).collect();

    Ok(PageDigest {
        file_name: file_name.to_string(),
        title,
        headings,
        excerpt,
    })
}

pub fn scan_site(site_dir: &Path) -> Result<Vec<PageDigest>> {
    html_files(site_dir)?
        .iter()
        .map(|path| {
            let html = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            digest_page(&relative_name(site_dir, path), &html)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};
    use crate::util::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_html_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("index.html"), "<html></html>").unwrap();
        write_file(&dir.path().join("insights/a-1.htm"), "<html></html>").unwrap();
        write_file(&dir.path().join("insights/notes.txt"), "x").unwrap();
        write_file(&dir.path().join(".hidden/page.html"), "<html></html>").unwrap();

        let names: Vec<String> = html_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| relative_name(dir.path(), p))
            .collect();
        assert_eq!(names, vec![".hidden/page.html", "index.html", "insights/a-1.htm"]);
    }

    #[test]
    fn test_missing_site_dir_is_setup_error() {
        let dir = TempDir::new().unwrap();
        let err = html_files(&dir.path().join("docs")).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Setup));
    }

    #[test]
    fn test_digest_page() {
        let html = "<html><head><title> Ocean   Data </title></head><body><main>\
<h1>Tides</h1><h2>Why</h2><p>Tides  move\nwater.</p></main></body></html>";
        let digest = digest_page("insights/tides-1.html", html).unwrap();
        assert_eq!(digest.title, "Ocean Data");
        assert_eq!(digest.headings, vec!["Tides", "Why"]);
        assert!(digest.excerpt.starts_with("Tides move water."));
    }

    #[test]
    fn test_digest_without_title_uses_file_name() {
        let digest = digest_page("about.html", "<p>x</p>").unwrap();
        assert_eq!(digest.title, "about.html");
    }
}
