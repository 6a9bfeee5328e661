use anyhow::{bail, Result};

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{AnthropicClient, GeminiClient, OpenAIClient};
use super::rotation::RotatingClient;
use crate::config::LlmConfig;

/// Build a single provider client for one credential.
pub fn create_provider_client(
    llm_config: &LlmConfig,
    model: &str,
    api_key: String,
) -> Result<Box<dyn LlmClient>> {
    let max_tokens = llm_config.get_max_tokens();
    let timeout = llm_config.timeout_secs;
    let model = model.to_string();

    match llm_config.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicClient::new(
            api_key, model, max_tokens, timeout,
        )?)),

        "openai" => Ok(Box::new(OpenAIClient::new(
            api_key, model, max_tokens, timeout,
        )?)),

        "openai-compatible" => {
            let base_url = llm_config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

            Ok(Box::new(OpenAIClient::with_base_url(
                api_key, model, base_url, max_tokens, timeout,
            )?))
        }

        "gemini" => match &llm_config.base_url {
            Some(base_url) => Ok(Box::new(GeminiClient::with_base_url(
                api_key,
                model,
                base_url.clone(),
                max_tokens,
                timeout,
            )?)),
            None => Ok(Box::new(GeminiClient::new(
                api_key, model, max_tokens, timeout,
            )?)),
        },

        unknown => bail!("Unknown LLM provider: {}", unknown),
    }
}

/// Create a rotating client for `model` with one provider client per
/// configured credential. Dry runs get the mock client.
pub fn create_client_for_model(
    llm_config: &LlmConfig,
    model: &str,
    dry_run: bool,
) -> Result<RotatingClient> {
    if dry_run {
        return Ok(RotatingClient::single(Box::new(MockLlmClient::new())));
    }

    let clients = llm_config
        .get_api_keys()?
        .into_iter()
        .map(|key| create_provider_client(llm_config, model, key.expose().to_string()))
        .collect::<Result<Vec<_>>>()?;

    RotatingClient::new(clients)
}

/// Client for planning stages (identity, sitemap, strategy, plans, posts).
pub fn create_client(llm_config: &LlmConfig, dry_run: bool) -> Result<RotatingClient> {
    create_client_for_model(llm_config, &llm_config.model, dry_run)
}

/// Client for full-page HTML generation.
pub fn create_page_client(llm_config: &LlmConfig, dry_run: bool) -> Result<RotatingClient> {
    create_client_for_model(llm_config, llm_config.get_page_model(), dry_run)
}
