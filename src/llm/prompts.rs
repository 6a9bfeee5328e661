// Prompt templates for every generation stage.
//
// Each prompt opens with a `## Task:` header naming the stage; the dry-run
// client keys its canned responses on those headers.

use crate::config::AnalyticsIds;
use crate::pipeline::types::SiteType;
use crate::site::tags::{adsense_script, gtm_head_script, gtm_noscript};

/// Slot marker the model must leave in listing pages.
pub const LISTING_SLOT: &str = "<!-- LISTING_GRID -->";

pub fn identity(raw_input: &str, site_type: SiteType) -> String {
    let (role, framework, fields) = match site_type {
        SiteType::Corporate => (
            "You are an expert in building corporate identities.",
            "corporate identity framework",
            "**Purpose:** [the most fundamental reason the organisation exists and what it contributes]\n\
**Mission:** [what it must concretely do now to achieve the purpose]\n\
**Vision:** [the specific, inspiring future it wants once the mission succeeds]\n\
**Tone:** [the personality, brand image and communication tone it presents]",
        ),
        SiteType::Personal => (
            "You are an expert in personal branding.",
            "personal brand framework",
            "**Concept:** [the core theme of this portfolio site]\n\
**Mission:** [the personal mission and guiding principles in exploring that theme]\n\
**Skills:** [the concrete fields of expertise that realise the philosophy]\n\
**Tone:** [the personality and communication tone of this person]",
        ),
    };

    format!(
        r#"## Task: Brand identity

{role}
Analyse the core philosophy and vision below and define the {framework}.

IMPORTANT: Output only the extracted result in the requested format, as Markdown.
No commentary, no conversational replies, no explanations.

### Core philosophy and vision
{raw_input}

---
### Framework to extract
{fields}
"#
    )
}

pub fn site_name(identity: &str, site_type: SiteType) -> String {
    format!(
        r#"## Task: Site name

Propose a short, memorable name for a {kind} website based on the {label} below,
plus a URL slug for it.

Rules:
- The slug uses only lowercase ASCII letters, digits and hyphens.
- Respond with JSON only: {{"site_name": "...", "slug": "..."}}

### {label}
{identity}
"#,
        kind = site_type.as_str(),
        label = site_type.identity_label(),
    )
}

pub fn sitemap(identity: &str, site_type: SiteType) -> String {
    let labels = site_type.nav_labels().join(", ");
    let (message, structure) = match site_type {
        SiteType::Corporate => (
            "Reflect the core message and structure of the organisation.",
            "Design concrete level-two pages that reflect the organisation's mission.",
        ),
        SiteType::Personal => (
            "Reflect the person's philosophy and expertise.",
            "Design concrete level-two pages that reflect the person's expertise \
(for example, concrete case studies under PROJECTS).",
        ),
    };

    format!(
        r###"## Task: Sitemap

You are a website UX architect.
Based on the {label} below, produce a hierarchical sitemap in Markdown that
helps visitors follow the site's reasoning.

### Rules
1. {message}
2. The global navigation has exactly these five level-one items: {labels}.
3. {structure}
4. Start with the heading "## Sitemap: [site name]".

### {label}
{identity}
"###,
        label = site_type.identity_label(),
    )
}

pub fn content_strategy(identity: &str, sitemap: &str, site_type: SiteType) -> String {
    let rules = match site_type {
        SiteType::Corporate => {
            "1. **Audience:** business leaders, researchers and forward-looking readers interested in societal change.\n\
2. **Tone:** progressive, analytical, logical, trustworthy.\n\
3. **Output:** three sections, each with concrete heading ideas and bullet summaries:\n\
--- A. Homepage strategy ---\n\
--- B. VISION page strategy (establishing trust) ---\n\
--- C. SOLUTIONS page strategy (proving capability) ---"
        }
        SiteType::Personal => {
            "1. **Audience:** recruiters, collaborators, and practitioners interested in the same field.\n\
2. **Tone:** expert, logical, thoughtful, forward-looking.\n\
3. **Output:** three sections, each with concrete heading ideas and bullet summaries:\n\
--- A. Homepage strategy (expertise visible at a glance) ---\n\
--- B. PROJECTS page strategy (evidence of work) ---\n\
--- C. INSIGHTS page strategy (sharing expertise) ---"
        }
    };

    format!(
        r#"## Task: Content strategy

You are a content strategist.
Using the {label} and the sitemap below, draft the content strategy for the
homepage and the main pages.

### Rules
{rules}

### {label}
{identity}

### Confirmed sitemap
{sitemap}
"#,
        label = site_type.identity_label(),
    )
}

pub fn page_list(identity: &str, strategy: &str, site_type: SiteType) -> String {
    format!(
        r#"## Task: Page list

You are a website architect. Using the identity and content strategy below,
list every fixed page that makes up the site's global navigation.

### Rules
1. Include every global navigation item ({labels}).
2. Main sections live in subdirectories with the file name `section/index.html`
   (for example `vision/index.html` or `projects/index.html`).
3. Policy pages live in the `legal/` directory.
4. `purpose` briefly states the page's strategic role.
5. File names are relative paths with forward slashes and end in `.html`.

Respond with a JSON array only:
[
  {{"title": "Home", "file_name": "index.html", "purpose": "..."}},
  {{"title": "...", "file_name": ".../index.html", "purpose": "..."}}
]

### Identity
{identity}

### Content strategy
{strategy}
"#,
        labels = site_type.nav_labels().join(", "),
    )
}

/// Everything the page HTML prompt needs.
pub struct PagePrompt<'a> {
    pub site_type: SiteType,
    pub title: &'a str,
    pub file_name: &'a str,
    pub purpose: &'a str,
    pub identity: &'a str,
    pub strategy: Option<&'a str>,
    /// Precomputed navigation block with relative hrefs.
    pub navigation: &'a str,
    pub content_role: &'a str,
    pub footer_rule: &'a str,
    pub analytics: &'a AnalyticsIds,
    pub article_date: Option<&'a str>,
    pub header_snippet: Option<&'a str>,
    pub footer_snippet: Option<&'a str>,
    pub listing: bool,
}

pub fn page_html(p: &PagePrompt<'_>) -> String {
    let mut requirements = vec![
        "**Complete document:** write the whole document from `<!DOCTYPE html>` to `</html>` inside one ```html code block.".to_string(),
        format!(
            "**Navigation:** this page's path is `{}`. Link to every page in the navigation list below exactly once in the header menu, in the given order, using exactly the href shown for each entry.",
            p.file_name
        ),
        format!("**Content role:** {}", p.content_role),
        "**Design:** load Tailwind CSS from its CDN (`https://cdn.tailwindcss.com`) and style everything with Tailwind classes. The layout must be responsive.".to_string(),
        format!("**Footer:** {}", p.footer_rule),
    ];

    if let Some(gtm) = &p.analytics.gtm_id {
        requirements.push(format!(
            "**Google Tag Manager:** put this as high as possible in <head>:\n{}\nand this immediately after <body>:\n{}",
            gtm_head_script(gtm),
            gtm_noscript(gtm)
        ));
    }
    if let Some(client) = &p.analytics.adsense_client_id {
        requirements.push(format!(
            "**Google AdSense:** put this as high as possible in <head>:\n{}",
            adsense_script(client)
        ));
    }
    if let Some(date) = p.article_date {
        requirements.push(format!(
            "**Publication date:** show `{}` near the page title.",
            date
        ));
    }
    if let Some(header) = p.header_snippet {
        requirements.push(format!(
            "**Header:** reuse this site header verbatim, adjusting only relative link prefixes:\n{}",
            header
        ));
    }
    if let Some(footer) = p.footer_snippet {
        requirements.push(format!(
            "**Footer markup:** reuse this site footer verbatim, adjusting only relative link prefixes:\n{}",
            footer
        ));
    }
    if p.listing {
        requirements.push(format!(
            "**Listing grid:** this is a listing page. Do not write article cards yourself. Leave the literal marker `{}` exactly where the card grid belongs inside <main>.",
            LISTING_SLOT
        ));
    }

    let requirements = requirements
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect::<Vec<_>>()
        .join("\n");

    let strategy = p
        .strategy
        .map(|s| format!("\n### Content strategy\n{}\n", s))
        .unwrap_or_default();

    format!(
        r#"## Task: Page HTML

You are a world-class web designer and front-end engineer.
Generate a single modern, responsive HTML file for the page described below,
based on the {label}{with_strategy}.

### Page
- Title: {title}
- File name: {file_name}
- Purpose: {purpose}

### Requirements
{requirements}

### Navigation list
{navigation}

### {label}
{identity}
{strategy}"#,
        label = p.site_type.identity_label(),
        with_strategy = if p.strategy.is_some() {
            " and the content strategy"
        } else {
            ""
        },
        title = p.title,
        file_name = p.file_name,
        purpose = p.purpose,
        navigation = p.navigation,
        identity = p.identity,
    )
}

pub fn page_summary(title: &str, headings: &[String], excerpt: &str, identity: &str) -> String {
    format!(
        r#"## Task: Page summary

Summarise the page below in one paragraph for a content plan.
State its role on the site and its main topic. Output the paragraph only.

### Page
- Title: {title}
- Headings: {headings}
- Excerpt: {excerpt}

### Site identity
{identity}
"#,
        headings = headings.join(" | "),
    )
}

pub fn priority_section(identity: &str, balance_report: &str, hubs: &str) -> String {
    format!(
        r#"## Task: Priority section

You are the editor of this site. Pick the one hub page that should receive
new articles next, so the site stays balanced and serves its identity.
Hubs with few articles are usually the best choice.

Respond with JSON only: {{"file_name": "<hub file name>", "reason": "..."}}

### Article counts per hub
{balance_report}

### Candidate hubs
{hubs}

### Site identity
{identity}
"#
    )
}

pub fn article_plans(
    hub_title: &str,
    hub_file: &str,
    hub_summary: &str,
    identity: &str,
    count: usize,
    start_number: usize,
) -> String {
    format!(
        r#"## Task: Article plans

Plan new detail articles for the hub page below.

Number of articles: {count}
Start number: {start_number}

### Rules
- Each file name is `<english-slug>-<number>.html`, numbered consecutively from the start number.
- Titles are specific and useful to the site's audience.
- `summary` is two or three sentences describing the article.

Respond with a JSON array only:
[{{"file_name": "topic-{start_number}.html", "title": "...", "summary": "..."}}]

### Hub
- Title: {hub_title}
- File name: {hub_file}
- Summary: {hub_summary}

### Site identity
{identity}
"#
    )
}

pub fn social_post(
    persona: &str,
    theme: &str,
    url: &str,
    research_summary: &str,
    keywords: &[String],
) -> String {
    format!(
        r#"## Task: Social post

{persona}

Write one short post announcing the article below, in your own voice.
The post must include the article URL unchanged and stay under 280 characters.

Theme: {theme}
Article URL: {url}
Keywords: {keywords}

### Research summary
{research_summary}

Respond with JSON only: {{"tweet": "...", "thought_process": "..."}}
"#,
        keywords = keywords.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_embeds_all_nav_labels() {
        let prompt = sitemap("A company about ocean conservation", SiteType::Corporate);
        assert!(prompt.starts_with("## Task: Sitemap"));
        assert!(prompt.contains("VISION, SOLUTIONS, INSIGHTS, COLLABORATION, CONTACT"));
        assert!(prompt.contains("A company about ocean conservation"));

        let personal = sitemap("x", SiteType::Personal);
        assert!(personal.contains("ABOUT, PHILOSOPHY, PROJECTS, INSIGHTS, CONTACT"));
    }

    #[test]
    fn test_sitemap_asks_for_quoted_heading() {
        let prompt = sitemap("identity text", SiteType::Corporate);
        assert!(prompt.contains("Start with the heading \"## Sitemap: [site name]\"."));
        assert!(prompt.trim_end().ends_with("identity text"));
    }

    #[test]
    fn test_identity_fields_follow_site_type() {
        assert!(identity("raw", SiteType::Corporate).contains("**Vision:**"));
        assert!(identity("raw", SiteType::Personal).contains("**Skills:**"));
    }

    #[test]
    fn test_page_html_optional_sections() {
        let analytics = AnalyticsIds {
            gtm_id: Some("GTM-ABC".to_string()),
            adsense_client_id: None,
        };
        let prompt = PagePrompt {
            site_type: SiteType::Corporate,
            title: "Insights",
            file_name: "insights/index.html",
            purpose: "Hub",
            identity: "id",
            strategy: None,
            navigation: "- Home (index.html) -> href=\"../index.html\"",
            content_role: "hub",
            footer_rule: "copyright",
            analytics: &analytics,
            article_date: None,
            header_snippet: None,
            footer_snippet: None,
            listing: true,
        };
        let text = page_html(&prompt);
        assert!(text.contains("- Title: Insights"));
        assert!(text.contains("GTM-ABC"));
        assert!(!text.contains("adsbygoogle"));
        assert!(text.contains(LISTING_SLOT));
        assert!(!text.contains("### Content strategy"));
    }

    #[test]
    fn test_article_plans_states_count_and_start() {
        let text = article_plans("Insights", "insights/index.html", "s", "id", 3, 13);
        assert!(text.contains("Number of articles: 3"));
        assert!(text.contains("Start number: 13"));
    }
}
