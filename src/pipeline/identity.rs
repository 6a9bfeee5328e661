use anyhow::Result;
use tracing::info;

use super::types::SiteType;
use crate::error::SiteGenError;
use crate::llm::client::LlmClient;
use crate::llm::prompts;

/// Turns a raw statement of purpose into a structured identity document.
pub struct IdentityGenerator<'a> {
    client: &'a dyn LlmClient,
}

impl<'a> IdentityGenerator<'a> {
    pub fn new(client: &'a dyn LlmClient) -> Self {
        Self { client }
    }

    pub async fn generate(&self, raw_input: &str, site_type: SiteType) -> Result<String> {
        info!("Forming {} from the statement of purpose...", site_type.identity_label());

        let response = self
            .client
            .complete(&prompts::identity(raw_input, site_type))
            .await
            .map_err(|e| SiteGenError::transient(format!("identity request failed: {:#}", e)))?;

        let identity = response.trim();
        if identity.is_empty() {
            return Err(SiteGenError::structural("identity response was empty").into());
        }
        info!("  ✓ Identity defined");
        Ok(identity.to_string())
    }
}
