//! Pull a complete HTML document out of a model response.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_HTML: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)```html[ \t]*\r?\n?(.*?</html>)\s*```").ok());

static DOCTYPE_SPAN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<!DOCTYPE\s+html.*</html>").ok());

const START_MARKER: &str = "[START HTML CODE]";

/// Strategy 1: an ```html fence whose body ends in `</html>`.
pub fn from_fenced_block(response: &str) -> Option<String> {
    FENCED_HTML
        .as_ref()?
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Strategy 2: a bare `<!DOCTYPE html> ... </html>` span.
pub fn from_doctype_span(response: &str) -> Option<String> {
    DOCTYPE_SPAN
        .as_ref()?
        .find(response)
        .map(|m| m.as_str().trim().to_string())
}

/// Strategy 3: whatever markup precedes the last `</html>`, once the start
/// marker and fence syntax are removed.
pub fn from_loose_markup(response: &str) -> Option<String> {
    let end = response.to_ascii_lowercase().rfind("</html>")?;
    let mut body = response[..end + "</html>".len()].replace(START_MARKER, "");

    let trimmed = body.trim_start();
    if trimmed.starts_with("```") {
        body = match trimmed.find('\n') {
            Some(idx) => trimmed[idx + 1..].to_string(),
            None => String::new(),
        };
    }

    let body = body.trim();
    if body.starts_with('<') {
        Some(body.to_string())
    } else {
        None
    }
}

/// Try each strategy in order. `None` means the response holds no usable
/// document.
pub fn extract_html(response: &str) -> Option<String> {
    from_fenced_block(response)
        .or_else(|| from_doctype_span(response))
        .or_else(|| from_loose_markup(response))
}
