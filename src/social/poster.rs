use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

use crate::config::SocialConfig;
use crate::error::SiteGenError;
use crate::llm::client_impl::http_client;
use crate::util::SecretString;

#[async_trait]
pub trait SocialPoster: Send + Sync {
    /// Publish `text`. Returns the platform's post ID when it reports one.
    async fn post(&self, text: &str) -> Result<Option<String>>;
}

/// Logs posts instead of publishing them.
pub struct DryRunPoster;

#[async_trait]
impl SocialPoster for DryRunPoster {
    async fn post(&self, text: &str) -> Result<Option<String>> {
        info!("[dry-run] Would post: {}", text);
        Ok(None)
    }
}

/// Posts through the X v2 API with an OAuth 2.0 bearer token.
pub struct XPoster {
    endpoint: String,
    token: SecretString,
    client: Client,
}

#[derive(Serialize)]
struct PostRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PostResponse {
    data: Option<PostData>,
}

#[derive(Deserialize)]
struct PostData {
    id: String,
}

impl XPoster {
    pub fn new(endpoint: String, token: String, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            endpoint,
            token: token.into(),
            client: http_client(timeout_secs)?,
        })
    }

    /// Token from the env var named in `[social]`. A missing token is a
    /// setup error.
    pub fn from_config(social: &SocialConfig, timeout_secs: u64) -> Result<Self> {
        let token = env::var(&social.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SiteGenError::setup(format!(
                    "posting token not found in environment variable: {}",
                    social.token_env
                ))
            })?;
        Self::new(social.endpoint.clone(), token, timeout_secs)
    }
}

#[async_trait]
impl SocialPoster for XPoster {
    async fn post(&self, text: &str) -> Result<Option<String>> {
        debug!("Posting {} chars to {}", text.chars().count(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(&PostRequest { text })
            .send()
            .await
            .context("Failed to send post request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("post rejected with status {}: {}", status.as_u16(), body);
        }

        let parsed: PostResponse = response
            .json()
            .await
            .context("Failed to parse post response")?;
        Ok(parsed.data.map(|d| d.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn test_x_poster_sends_bearer_and_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/tweets")
            .match_header("authorization", "Bearer tok")
            .match_body(mockito::Matcher::Json(serde_json::json!({"text": "hello"})))
            .with_status(201)
            .with_body(r#"{"data":{"id":"1850","text":"hello"}}"#)
            .create_async()
            .await;

        let poster = XPoster::new(format!("{}/2/tweets", server.url()), "tok".to_string(), 10).unwrap();
        assert_eq!(poster.post("hello").await.unwrap().as_deref(), Some("1850"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_x_poster_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/2/tweets")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let poster = XPoster::new(format!("{}/2/tweets", server.url()), "tok".to_string(), 10).unwrap();
        let err = poster.post("hello").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[test]
    #[serial]
    fn test_missing_token_is_setup_error() {
        let social = SocialConfig {
            token_env: "SITEGEN_UNSET_POST_TOKEN".to_string(),
            ..SocialConfig::default()
        };
        env::remove_var("SITEGEN_UNSET_POST_TOKEN");
        let err = XPoster::from_config(&social, 10).err().unwrap();
        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::Setup)
        );
    }

    #[tokio::test]
    async fn test_dry_run_poster() {
        assert_eq!(DryRunPoster.post("x").await.unwrap(), None);
    }
}
