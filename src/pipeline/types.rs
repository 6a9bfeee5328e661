use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which flavour of site the pipeline builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Corporate,
    Personal,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Corporate => "corporate",
            SiteType::Personal => "personal",
        }
    }

    /// The five level-one navigation labels every sitemap must use.
    pub fn nav_labels(&self) -> [&'static str; 5] {
        match self {
            SiteType::Corporate => ["VISION", "SOLUTIONS", "INSIGHTS", "COLLABORATION", "CONTACT"],
            SiteType::Personal => ["ABOUT", "PHILOSOPHY", "PROJECTS", "INSIGHTS", "CONTACT"],
        }
    }

    /// Label used for the identity document in prompts.
    pub fn identity_label(&self) -> &'static str {
        match self {
            SiteType::Corporate => "Corporate Identity",
            SiteType::Personal => "Personal Brand",
        }
    }

    /// Guess the site type from a stored identity document.
    /// Only used when no site record exists.
    pub fn infer_from_identity(identity: &str) -> Self {
        let lower = identity.to_lowercase();
        if lower.contains("corporate") || (lower.contains("purpose") && lower.contains("vision")) {
            SiteType::Corporate
        } else {
            SiteType::Personal
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "corporate" | "company" => Ok(SiteType::Corporate),
            "2" | "personal" | "portfolio" => Ok(SiteType::Personal),
            _ => bail!("Unknown site type: {} (expected corporate or personal)", s),
        }
    }
}

/// A planned output page. `file_name` doubles as the page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPage {
    pub title: String,
    pub file_name: String,
    #[serde(default)]
    pub purpose: String,
}

impl TargetPage {
    pub fn new(
        title: impl Into<String>,
        file_name: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            file_name: file_name.into(),
            purpose: purpose.into(),
        }
    }

    pub fn is_hub(&self) -> bool {
        is_hub_path(&self.file_name)
    }

    /// First path segment, or `None` for pages at the site root.
    pub fn section(&self) -> Option<&str> {
        section_of(&self.file_name)
    }
}

pub fn is_hub_path(file_name: &str) -> bool {
    file_name == "index.html" || file_name.ends_with("/index.html")
}

pub fn section_of(file_name: &str) -> Option<&str> {
    file_name.split_once('/').map(|(section, _)| section)
}

/// Directory part of a site-relative path (`""` for root files).
pub fn parent_dir(file_name: &str) -> &str {
    file_name.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Hub page that owns `file_name`.
pub fn parent_hub(file_name: &str) -> String {
    match parent_dir(file_name) {
        "" => "index.html".to_string(),
        dir => format!("{}/index.html", dir),
    }
}

/// Check that a file name is a forward-slash relative path to an HTML file.
pub fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.is_empty() {
        bail!("empty file name");
    }
    if file_name.starts_with('/') || file_name.contains('\\') || file_name.contains("://") {
        bail!("not a relative forward-slash path: {}", file_name);
    }
    if file_name.split('/').any(|seg| seg.is_empty() || seg == "..") {
        bail!("invalid path segment in {}", file_name);
    }
    let lower = file_name.to_lowercase();
    if !(lower.ends_with(".html") || lower.ends_with(".htm")) {
        bail!("not an HTML file: {}", file_name);
    }
    Ok(())
}

/// Persisted facts about a generated site (`site.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_name: String,
    pub slug: String,
    pub site_type: SiteType,
}
