//! Analytics tag injection.
//!
//! Existing AdSense and Tag Manager snippets are removed before fresh ones
//! are inserted, so running the injector again with the same IDs leaves
//! every file byte-for-byte unchanged.

use anyhow::{Context, Result};
use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use scraper::{ElementRef, Html, Node};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::scan::{html_files, relative_name, selector};
use crate::config::AnalyticsIds;

pub fn gtm_head_script(gtm_id: &str) -> String {
    format!(
        "<script>(function(w,d,s,l,i){{w[l]=w[l]||[];w[l].push({{'gtm.start':\n\
new Date().getTime(),event:'gtm.js'}});var f=d.getElementsByTagName(s)[0],\n\
j=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=\n\
'https://www.googletagmanager.com/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);\n\
}})(window,document,'script','dataLayer','{}');</script>",
        gtm_id
    )
}

pub fn gtm_noscript(gtm_id: &str) -> String {
    format!(
        "<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id={}\"\n\
height=\"0\" width=\"0\" style=\"display:none;visibility:hidden\"></iframe></noscript>",
        gtm_id
    )
}

pub fn adsense_script(client_id: &str) -> String {
    format!(
        "<script async src=\"https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js?client={}\"\n     crossorigin=\"anonymous\"></script>",
        client_id
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// Files with both `<head>` and `<body>`
    pub processed: usize,
    /// Processed files whose content changed
    pub written: usize,
    /// Files without `<head>` or `<body>`, or that failed to process
    pub skipped: usize,
}

/// True if `lower` has an opening `<name>` or `<name ...>` tag.
fn has_open_tag(lower: &str, name: &str) -> bool {
    let open = format!("<{}", name);
    lower.match_indices(&open).any(|(i, _)| {
        lower[i + open.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
    })
}

fn has_head_and_body(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    has_open_tag(&lower, "head") && has_open_tag(&lower, "body")
}

fn is_adsense_script(el: &ElementRef<'_>) -> bool {
    el.value()
        .attr("src")
        .map(|src| src.contains("adsbygoogle.js"))
        .unwrap_or(false)
}

fn is_gtm_script(el: &ElementRef<'_>, gtm_id: &str) -> bool {
    let text: String = el.text().collect();
    text.contains("gtm.js") && text.contains(gtm_id)
}

fn is_gtm_noscript(el: &ElementRef<'_>) -> bool {
    el.inner_html().contains("googletagmanager.com")
}

/// Copy the children of `src` under `dest`, recursively.
fn copy_children(dest: &mut NodeMut<'_, Node>, src: NodeRef<'_, Node>) {
    for child in src.children() {
        let mut copy = dest.append(child.value().clone());
        copy_children(&mut copy, child);
    }
}

/// Insert the nodes of `fragment` at the start of `parent`, in order.
fn prepend_fragment(tree: &mut Tree<Node>, parent: NodeId, fragment: &str) -> Result<()> {
    let parsed = Html::parse_fragment(fragment);
    let nodes: Vec<NodeRef<'_, Node>> = parsed.root_element().children().collect();
    for src in nodes.into_iter().rev() {
        let mut target = tree.get_mut(parent).context("insertion point vanished")?;
        let mut copy = target.prepend(src.value().clone());
        copy_children(&mut copy, src);
    }
    Ok(())
}

/// Re-collapse boolean attributes the serializer writes out as `=""`.
fn collapse_boolean_attrs(html: &str) -> String {
    html.replace("async=\"\"", "async")
        .replace("crossorigin=\"\"", "crossorigin")
}

/// Inject the configured snippets into one document.
/// `Ok(None)` if the document has no `<head>` or `<body>`.
pub fn inject_into_html(html: &str, ids: &AnalyticsIds) -> Result<Option<String>> {
    if !has_head_and_body(html) {
        return Ok(None);
    }

    let mut doc = Html::parse_document(html);
    let head_sel = selector("head")?;
    let body_sel = selector("body")?;
    let script_sel = selector("script")?;
    let noscript_sel = selector("noscript")?;

    let (head_id, body_id, stale) = {
        let Some(head) = doc.select(&head_sel).next() else {
            return Ok(None);
        };
        let Some(body) = doc.select(&body_sel).next() else {
            return Ok(None);
        };

        let mut stale: Vec<NodeId> = Vec::new();
        if ids.adsense_client_id.is_some() {
            stale.extend(
                head.select(&script_sel)
                    .filter(is_adsense_script)
                    .map(|el| el.id()),
            );
        }
        if let Some(gtm_id) = &ids.gtm_id {
            stale.extend(
                head.select(&script_sel)
                    .filter(|el| is_gtm_script(el, gtm_id))
                    .map(|el| el.id()),
            );
            stale.extend(
                body.select(&noscript_sel)
                    .filter(is_gtm_noscript)
                    .map(|el| el.id()),
            );
        }
        (head.id(), body.id(), stale)
    };

    for id in stale {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    // Prepending in reverse leaves AdSense first, then GTM.
    if let Some(gtm_id) = &ids.gtm_id {
        prepend_fragment(&mut doc.tree, head_id, &gtm_head_script(gtm_id))?;
        prepend_fragment(&mut doc.tree, body_id, &gtm_noscript(gtm_id))?;
    }
    if let Some(client_id) = &ids.adsense_client_id {
        prepend_fragment(&mut doc.tree, head_id, &adsense_script(client_id))?;
    }

    Ok(Some(collapse_boolean_attrs(&doc.html())))
}

pub struct TagInjector {
    ids: AnalyticsIds,
}

impl TagInjector {
    pub fn new(ids: AnalyticsIds) -> Self {
        Self { ids }
    }

    /// Inject into every HTML file under `site_dir`. Only changed files are
    /// written.
    pub fn run(&self, site_dir: &Path) -> Result<InjectionReport> {
        let mut report = InjectionReport::default();
        if self.ids.is_empty() {
            info!("No GTM or AdSense ID configured, skipping tag injection");
            return Ok(report);
        }

        info!("Injecting analytics tags into {}", site_dir.display());
        for path in html_files(site_dir)? {
            let name = relative_name(site_dir, &path);
            match self.process_file(&path) {
                Ok(Some(changed)) => {
                    report.processed += 1;
                    if changed {
                        report.written += 1;
                    }
                }
                Ok(None) => {
                    debug!("Skipping {}: no <head> or <body>", name);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Tag injection failed for {}: {:#}", name, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "  ✓ Tags injected: {} processed, {} updated, {} skipped",
            report.processed, report.written, report.skipped
        );
        Ok(report)
    }

    fn process_file(&self, path: &Path) -> Result<Option<bool>> {
        let original = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(updated) = inject_into_html(&original, &self.ids)? else {
            return Ok(None);
        };
        if updated == original {
            return Ok(Some(false));
        }
        fs::write(path, &updated).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(true))
    }
}
