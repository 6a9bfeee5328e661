//! Deterministic card grid for listing pages.
//!
//! The model lays out the page shell and leaves [`LISTING_SLOT`] where the
//! cards belong; the grid itself is rendered here from the page list so a
//! listing never misses an entry.

use super::navigation::relative_href;
use super::types::TargetPage;
use crate::util::escape_html;

pub use crate::llm::prompts::LISTING_SLOT;

/// Render one card per entry, in order, linking relative to `current_file`.
pub fn render_listing_grid(entries: &[TargetPage], current_file: &str) -> String {
    let mut grid = String::from(
        "<div class=\"grid gap-6 sm:grid-cols-2 lg:grid-cols-3\" data-listing-grid>\n",
    );
    for entry in entries {
        grid.push_str(&format!(
            "  <a href=\"{}\" class=\"block rounded-xl border border-slate-200 p-6 transition hover:shadow-lg\">\
<article><h3 class=\"text-lg font-semibold text-slate-900\">{}</h3>\
<p class=\"mt-2 text-sm text-slate-600\">{}</p></article></a>\n",
            escape_html(&relative_href(current_file, &entry.file_name)),
            escape_html(&entry.title),
            escape_html(&entry.purpose),
        ));
    }
    if entries.is_empty() {
        grid.push_str("  <p class=\"text-slate-500\">No articles yet.</p>\n");
    }
    grid.push_str("</div>");
    grid
}

/// Put `grid` into the slot. If the model left no slot, the grid goes
/// before `</main>`, else before `</body>`, else at the end.
pub fn fill_listing_slot(html: &str, grid: &str) -> String {
    if html.contains(LISTING_SLOT) {
        return html.replacen(LISTING_SLOT, grid, 1);
    }
    for closing in ["</main>", "</body>"] {
        if let Some(idx) = find_ascii_case_insensitive(html, closing) {
            let mut out = String::with_capacity(html.len() + grid.len() + 1);
            out.push_str(&html[..idx]);
            out.push_str(grid);
            out.push('\n');
            out.push_str(&html[idx..]);
            return out;
        }
    }
    format!("{}\n{}", html, grid)
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle))
}
