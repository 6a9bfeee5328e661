//! Article plans: the persistent record of every page the cycle knows about.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::types::{is_hub_path, parent_hub, section_of, TargetPage};
use crate::util::write_file;

pub const PLANS_JSON: &str = "planned_articles.json";
pub const PLANS_MARKDOWN: &str = "planned_articles.md";

static ARTICLE_NUMBER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"-(\d+)\.html$").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePlan {
    pub file_name: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ArticlePlan {
    pub fn new(
        file_name: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            title: title.into(),
            summary: summary.into(),
            created_at,
            updated_at: None,
        }
    }

    pub fn is_hub(&self) -> bool {
        is_hub_path(&self.file_name)
    }

    pub fn to_target_page(&self) -> TargetPage {
        TargetPage::new(&self.title, &self.file_name, &self.summary)
    }
}

/// Every planned page, in plan order, as navigation entries.
pub fn navigation_pages(plans: &[ArticlePlan]) -> Vec<TargetPage> {
    plans.iter().map(ArticlePlan::to_target_page).collect()
}

/// Read plans from `planned_articles.json`. `Ok(None)` if the file is absent.
pub fn load_plans(reports_dir: &Path) -> Result<Option<Vec<ArticlePlan>>> {
    let path = reports_dir.join(PLANS_JSON);
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let plans = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(plans))
}

/// Write plans as JSON plus a Markdown table for people to read.
pub fn save_plans(reports_dir: &Path, plans: &[ArticlePlan]) -> Result<()> {
    let json = serde_json::to_string_pretty(plans).context("Failed to serialize plans")?;
    write_file(&reports_dir.join(PLANS_JSON), &json)?;
    write_file(&reports_dir.join(PLANS_MARKDOWN), &render_plans_markdown(plans))
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn render_plans_markdown(plans: &[ArticlePlan]) -> String {
    let mut out = String::from(
        "| file_name | title | summary | created_at | updated_at |\n| :--- | :--- | :--- | :--- | :--- |\n",
    );
    for plan in plans {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            table_cell(&plan.file_name),
            table_cell(&plan.title),
            table_cell(&plan.summary),
            plan.created_at.to_rfc3339(),
            plan.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ));
    }
    out
}

/// Article counts per hub, in first-seen hub order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub entries: Vec<(String, usize)>,
}

impl BalanceReport {
    /// Hubs in `excluded` sections are left out. Articles whose parent hub
    /// is not a known plan are not counted.
    pub fn compute(plans: &[ArticlePlan], excluded: &[String]) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<(String, usize)> = plans
            .iter()
            .filter(|p| p.is_hub() && seen.insert(p.file_name.as_str()))
            .map(|p| (p.file_name.clone(), 0))
            .collect();

        for plan in plans.iter().filter(|p| !p.is_hub()) {
            let hub = parent_hub(&plan.file_name);
            if let Some(entry) = entries.iter_mut().find(|(h, _)| *h == hub) {
                entry.1 += 1;
            }
        }

        entries.retain(|(hub, _)| match section_of(hub) {
            Some(section) => !excluded.iter().any(|e| e == section),
            None => true,
        });
        Self { entries }
    }

    pub fn count(&self, hub: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(h, _)| h == hub)
            .map(|(_, c)| *c)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("| Hub | Articles |\n| :--- | :--- |\n");
        for (hub, count) in &self.entries {
            out.push_str(&format!("| {} | {} |\n", hub, count));
        }
        out
    }
}

/// Next free article number: one past the largest `-N.html` suffix, or 1.
pub fn next_article_number<'a, I>(file_names: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(re) = ARTICLE_NUMBER.as_ref() else {
        return 1;
    };
    file_names
        .into_iter()
        .filter_map(|name| re.captures(name))
        .filter_map(|c| c[1].parse::<usize>().ok())
        .max()
        .map_or(1, |max| max + 1)
}
