//! Relative link computation for generated pages.
//!
//! Every page links to every other page in the page list. Links are always
//! relative to the linking page's own directory so the site works from any
//! base URL.

use super::types::TargetPage;

/// Relative href from the page at `from` to the page at `to`.
/// Both are site-relative forward-slash paths.
pub fn relative_href(from: &str, to: &str) -> String {
    let from_dirs: Vec<&str> = match from.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to_segments: Vec<&str> = to.split('/').collect();
    let to_dirs = &to_segments[..to_segments.len() - 1];

    let common = from_dirs
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut href = "../".repeat(from_dirs.len() - common);
    href.push_str(&to_segments[common..].join("/"));
    href
}

/// Navigation block embedded in page prompts: one line per page, in list
/// order, with the href the current page must use.
pub fn navigation_block(current: &str, pages: &[TargetPage]) -> String {
    pages
        .iter()
        .map(|p| {
            format!(
                "- {} ({}) -> href=\"{}\"",
                p.title,
                p.file_name,
                relative_href(current, &p.file_name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_href_from_root() {
        assert_eq!(relative_href("index.html", "vision/index.html"), "vision/index.html");
        assert_eq!(relative_href("index.html", "about.html"), "about.html");
    }

    #[test]
    fn test_relative_href_from_section() {
        assert_eq!(relative_href("insights/page.html", "index.html"), "../index.html");
        assert_eq!(
            relative_href("insights/page.html", "vision/index.html"),
            "../vision/index.html"
        );
        assert_eq!(
            relative_href("insights/page.html", "insights/index.html"),
            "index.html"
        );
    }

    #[test]
    fn test_relative_href_nested() {
        assert_eq!(
            relative_href("a/b/c.html", "a/d/e.html"),
            "../d/e.html"
        );
        assert_eq!(relative_href("a/b/c.html", "index.html"), "../../index.html");
        assert_eq!(relative_href("a/b/c.html", "a/b/c.html"), "c.html");
    }

    #[test]
    fn test_navigation_block_one_entry_per_page_in_order() {
        let pages = vec![
            TargetPage::new("Home", "index.html", ""),
            TargetPage::new("Vision", "vision/index.html", ""),
            TargetPage::new("Insights", "insights/index.html", ""),
            TargetPage::new("Privacy", "legal/privacy.html", ""),
        ];
        let block = navigation_block("insights/a-1.html", &pages);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), pages.len());
        for (line, page) in lines.iter().zip(pages.iter()) {
            assert!(line.contains(&format!("({})", page.file_name)));
        }
        assert_eq!(lines[0], "- Home (index.html) -> href=\"../index.html\"");
        assert_eq!(
            lines[2],
            "- Insights (insights/index.html) -> href=\"index.html\""
        );
    }

    #[test]
    fn test_navigation_block_empty() {
        assert_eq!(navigation_block("index.html", &[]), "");
    }
}
