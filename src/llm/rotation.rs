//! Credential rotation over a pool of provider clients.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use super::client::{LlmClient, ResponseFormat};
use crate::error::SiteGenError;

/// Something that can switch to another credential.
pub trait KeyRotation: Send + Sync {
    /// Switch credentials. Returns false when there is nothing to switch to.
    fn rotate(&self) -> bool;
}

/// Never rotates. For single-credential callers and tests.
pub struct NoRotation;

impl KeyRotation for NoRotation {
    fn rotate(&self) -> bool {
        false
    }
}

/// One provider client per credential; requests go to the current one.
pub struct RotatingClient {
    clients: Vec<Box<dyn LlmClient>>,
    current: AtomicUsize,
}

impl RotatingClient {
    /// Start on a random credential.
    pub fn new(clients: Vec<Box<dyn LlmClient>>) -> Result<Self> {
        if clients.is_empty() {
            return Err(SiteGenError::setup("no API credentials configured").into());
        }
        let start = rand::random_range(0..clients.len());
        Ok(Self {
            clients,
            current: AtomicUsize::new(start),
        })
    }

    pub fn single(client: Box<dyn LlmClient>) -> Self {
        Self {
            clients: vec![client],
            current: AtomicUsize::new(0),
        }
    }

    /// Pin the starting credential.
    pub fn with_start(self, index: usize) -> Self {
        self.current
            .store(index % self.clients.len(), Ordering::SeqCst);
        self
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

impl KeyRotation for RotatingClient {
    /// Pick a different credential at random.
    fn rotate(&self) -> bool {
        let len = self.clients.len();
        if len < 2 {
            return false;
        }
        let current = self.current_index();
        let mut next = rand::random_range(0..len - 1);
        if next >= current {
            next += 1;
        }
        self.current.store(next, Ordering::SeqCst);
        info!("Switched to API credential {} of {}", next + 1, len);
        true
    }
}

#[async_trait]
impl LlmClient for RotatingClient {
    async fn complete_with(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        self.clients[self.current_index()]
            .complete_with(prompt, format)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};

    struct Named(&'static str);

    #[async_trait]
    impl LlmClient for Named {
        async fn complete_with(&self, _prompt: &str, _format: ResponseFormat) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn pool(n: usize) -> Vec<Box<dyn LlmClient>> {
        const NAMES: [&str; 4] = ["a", "b", "c", "d"];
        (0..n)
            .map(|i| Box::new(Named(NAMES[i])) as Box<dyn LlmClient>)
            .collect()
    }

    #[test]
    fn test_empty_pool_is_setup_error() {
        let err = RotatingClient::new(Vec::new()).err().unwrap();
        assert_eq!(error_kind(&err), Some(ErrorKind::Setup));
    }

    #[test]
    fn test_rotate_single_is_noop() {
        let client = RotatingClient::new(pool(1)).unwrap();
        assert!(!client.rotate());
        assert_eq!(client.current_index(), 0);
    }

    #[test]
    fn test_rotate_always_changes_credential() {
        let client = RotatingClient::new(pool(3)).unwrap();
        for _ in 0..50 {
            let before = client.current_index();
            assert!(client.rotate());
            let after = client.current_index();
            assert_ne!(before, after);
            assert!(after < 3);
        }
    }

    #[tokio::test]
    async fn test_requests_go_to_current_client() {
        let client = RotatingClient::new(pool(2)).unwrap().with_start(1);
        assert_eq!(client.complete("x").await.unwrap(), "b");
        assert!(client.rotate());
        assert_eq!(client.complete("x").await.unwrap(), "a");
    }
}
