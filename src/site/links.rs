//! Internal link checking and repair.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::Html;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::scan::{html_files, relative_name, selector};

const EXTERNAL_PREFIXES: [&str; 6] = ["http", "mailto", "#", "tel:", "//", "javascript:"];

static ROOT_PARENT_HREF: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?i)(\bhref\s*=\s*)(["'])(\.\.(?:/index\.html[^"']*)?)(["'])"#).ok()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    /// Site-relative file holding the link
    pub source: String,
    pub href: String,
    /// Where the link resolves, relative to the site root
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub files_checked: usize,
    pub links_checked: usize,
    pub broken: Vec<BrokenLink>,
}

fn is_internal(href: &str) -> bool {
    let href = href.trim();
    !href.is_empty()
        && !EXTERNAL_PREFIXES
            .iter()
            .any(|p| href.to_ascii_lowercase().starts_with(p))
}

fn strip_query_and_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Lexically resolve `href` against the directory of `source`.
fn resolve(source: &str, href: &str) -> PathBuf {
    let mut parts: Vec<String> = source
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').map(str::to_string).collect())
        .unwrap_or_default();
    for component in Path::new(href).components() {
        match component {
            Component::ParentDir => {
                if parts.pop().is_none() {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(seg) => parts.push(seg.to_string_lossy().into_owned()),
            Component::RootDir => parts.clear(),
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    parts.iter().collect()
}

/// Report every internal link whose target does not exist. Read-only.
pub fn check_links(site_dir: &Path) -> Result<LinkReport> {
    let link_sel = selector("a[href]")?;
    let mut report = LinkReport::default();

    for path in html_files(site_dir)? {
        let source = relative_name(site_dir, &path);
        let html = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = Html::parse_document(&html);
        report.files_checked += 1;

        for href in doc
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter(|h| is_internal(h))
        {
            let target_path = strip_query_and_fragment(href.trim());
            if target_path.is_empty() {
                continue;
            }
            report.links_checked += 1;
            let target = resolve(&source, target_path);
            if target.starts_with("..") || !site_dir.join(&target).exists() {
                report.broken.push(BrokenLink {
                    source: source.clone(),
                    href: href.to_string(),
                    target: target.to_string_lossy().replace('\\', "/"),
                });
            }
        }
    }

    info!(
        "Checked {} links in {} files: {} broken",
        report.links_checked,
        report.files_checked,
        report.broken.len()
    );
    Ok(report)
}

/// Repair root-level pages that link above the site root.
/// Returns the updated content, or `None` if nothing changed.
pub fn fix_root_links(html: &str) -> Option<String> {
    let re = ROOT_PARENT_HREF.as_ref()?;
    let mut changed = false;
    let fixed = re.replace_all(html, |caps: &Captures<'_>| {
        let href = &caps[3];
        let replacement = match href.strip_prefix("../") {
            Some(rest) => rest.to_string(),
            None => "index.html".to_string(),
        };
        changed = true;
        format!("{}{}{}{}", &caps[1], &caps[2], replacement, &caps[4])
    });
    changed.then(|| fixed.into_owned())
}

/// Fix links in files at the site root. Returns the number of files written.
pub fn fix_links(site_dir: &Path) -> Result<usize> {
    let mut modified = 0;
    for path in html_files(site_dir)? {
        let name = relative_name(site_dir, &path);
        if name.contains('/') {
            continue;
        }
        let html = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if let Some(fixed) = fix_root_links(&html) {
            fs::write(&path, fixed)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("  Fixed root links in {}", name);
            modified += 1;
        }
    }
    info!("Files modified: {}", modified);
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::write_file;
    use tempfile::TempDir;

    fn page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!("<a href=\"{}\">x</a>", l))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("insights/a.html", "../index.html"), PathBuf::from("index.html"));
        assert_eq!(resolve("index.html", "vision/index.html"), PathBuf::from("vision/index.html"));
        assert_eq!(resolve("a/b/c.html", "./d.html"), PathBuf::from("a/b/d.html"));
        assert_eq!(resolve("index.html", "../up.html"), PathBuf::from("../up.html"));
    }

    #[test]
    fn test_all_links_resolve() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join("index.html"),
            &page(&["insights/index.html", "https://example.com", "#top", "mailto:a@b.c"]),
        )
        .unwrap();
        write_file(
            &dir.path().join("insights/index.html"),
            &page(&["../index.html#hero", "a-1.html?ref=hub"]),
        )
        .unwrap();
        write_file(&dir.path().join("insights/a-1.html"), &page(&["index.html"])).unwrap();

        let report = check_links(dir.path()).unwrap();
        assert_eq!(report.files_checked, 3);
        assert_eq!(report.links_checked, 4);
        assert!(report.broken.is_empty());
    }

    #[test]
    fn test_one_dangling_link() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("index.html"), &page(&["insights/index.html"])).unwrap();
        write_file(
            &dir.path().join("insights/index.html"),
            &page(&["../index.html", "missing-2.html"]),
        )
        .unwrap();

        let report = check_links(dir.path()).unwrap();
        assert_eq!(
            report.broken,
            vec![BrokenLink {
                source: "insights/index.html".to_string(),
                href: "missing-2.html".to_string(),
                target: "insights/missing-2.html".to_string(),
            }]
        );
    }

    #[test]
    fn test_fix_root_links() {
        let html = r#"<a href="../index.html">Home</a> <a href='../index.html#top'>Top</a> <a href="..">Up</a> <a href="../vision/index.html">V</a>"#;
        let fixed = fix_root_links(html).unwrap();
        assert_eq!(
            fixed,
            r#"<a href="index.html">Home</a> <a href='index.html#top'>Top</a> <a href="index.html">Up</a> <a href="../vision/index.html">V</a>"#
        );
        assert_eq!(fix_root_links(r#"<a href="vision/index.html">V</a>"#), None);
    }

    #[test]
    fn test_fix_links_only_touches_root_files() {
        let dir = TempDir::new().unwrap();
        let bad = page(&["../index.html"]);
        write_file(&dir.path().join("index.html"), &bad).unwrap();
        write_file(&dir.path().join("insights/index.html"), &bad).unwrap();

        assert_eq!(fix_links(dir.path()).unwrap(), 1);
        assert!(fs::read_to_string(dir.path().join("index.html"))
            .unwrap()
            .contains("href=\"index.html\""));
        assert_eq!(
            fs::read_to_string(dir.path().join("insights/index.html")).unwrap(),
            bad
        );
        assert_eq!(fix_links(dir.path()).unwrap(), 0);
    }
}
