use anyhow::Result;
use async_trait::async_trait;

use super::prompts::LISTING_SLOT;

/// Output shape requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Provider JSON mode where supported; plain text otherwise.
    Json,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_with(&self, prompt: &str, format: ResponseFormat) -> Result<String>;

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.complete_with(prompt, ResponseFormat::Text).await
    }
}

/// Canned responses for `--dry-run`, keyed on the task header of each prompt.
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

/// Value of a `Label: value` line in a prompt.
fn prompt_field<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
}

fn mock_page(prompt: &str) -> String {
    let title = prompt_field(prompt, "- Title:").unwrap_or("Untitled");
    let slot = if prompt.contains(LISTING_SLOT) {
        LISTING_SLOT
    } else {
        "<p>Placeholder content generated in dry-run mode.</p>"
    };
    format!(
        "Here is the page.\n```html\n<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<script src=\"https://cdn.tailwindcss.com\"></script>\n</head>\n<body>\n<header><nav><a href=\"index.html\">Home</a></nav></header>\n<main>\n<h1>{title}</h1>\n{slot}\n</main>\n<footer><p>&copy; Dry Run</p></footer>\n</body>\n</html>\n```",
    )
}

fn mock_article_plans(prompt: &str) -> String {
    let count: usize = prompt_field(prompt, "Number of articles:")
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    let start: usize = prompt_field(prompt, "Start number:")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let plans: Vec<serde_json::Value> = (start..start + count)
        .map(|n| {
            serde_json::json!({
                "file_name": format!("article-{}.html", n),
                "title": format!("Dry Run Article {}", n),
                "summary": "A placeholder article planned in dry-run mode."
            })
        })
        .collect();
    serde_json::Value::Array(plans).to_string()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_with(&self, prompt: &str, _format: ResponseFormat) -> Result<String> {
        let response = if prompt.contains("## Task: Brand identity") {
            "## Identity\n\n**Purpose:** Placeholder purpose.\n\n**Mission:** Placeholder mission.\n\n**Vision:** Placeholder vision.\n\n**Tone:** Calm and precise."
                .to_string()
        } else if prompt.contains("## Task: Site name") {
            r#"{"site_name": "Dry Run Studio", "slug": "dry-run-studio"}"#.to_string()
        } else if prompt.contains("## Task: Sitemap") {
            "- Home (index.html)\n- Insights (insights/index.html)\n- Privacy (legal/privacy.html)"
                .to_string()
        } else if prompt.contains("## Task: Content strategy") {
            "## Audience\nCurious readers.\n\n## Tone\nPlain.\n\n## Content pillars\nPlaceholders."
                .to_string()
        } else if prompt.contains("## Task: Page list") {
            r#"[
  {"title": "Home", "file_name": "index.html", "purpose": "Landing page"},
  {"title": "Insights", "file_name": "insights/index.html", "purpose": "Article hub"},
  {"title": "First Insight", "file_name": "insights/first-insight-1.html", "purpose": "Opening article"},
  {"title": "Privacy Policy", "file_name": "legal/privacy.html", "purpose": "Privacy policy"}
]"#
            .to_string()
        } else if prompt.contains("## Task: Page HTML") {
            mock_page(prompt)
        } else if prompt.contains("## Task: Page summary") {
            "A placeholder summary of the page.".to_string()
        } else if prompt.contains("## Task: Priority section") {
            r#"{"file_name": "insights/index.html", "reason": "Fewest articles"}"#.to_string()
        } else if prompt.contains("## Task: Article plans") {
            mock_article_plans(prompt)
        } else if prompt.contains("## Task: Social post") {
            let url = prompt_field(prompt, "Article URL:").unwrap_or("");
            serde_json::json!({
                "tweet": format!("New article is up. {}", url),
                "thought_process": "Dry-run post."
            })
            .to_string()
        } else {
            r#"{"status": "mock"}"#.to_string()
        };
        Ok(response)
    }
}
