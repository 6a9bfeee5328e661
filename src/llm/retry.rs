//! Retry policy for model calls.
//!
//! The policy owns attempt counting, pauses and credential rotation; the
//! operation being retried only reports what went wrong through
//! [`AttemptError`].

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use super::rotation::KeyRotation;
use crate::error::{is_overloaded, SiteGenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause before every retry.
    Fixed,
    /// Pause doubles after every attempt.
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    AnyFailure,
    /// Only rate-limit and unavailable errors retry; anything else aborts.
    OverloadedOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: Backoff,
    pub rotate_credentials: bool,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            rotate_credentials: true,
            retry_on: RetryOn::AnyFailure,
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug)]
pub enum AttemptError {
    /// The request itself failed (network, HTTP status, provider error).
    Request(anyhow::Error),
    /// The request succeeded but the output was unusable.
    Output(String),
}

impl RetryPolicy {
    /// Pause after the given 1-based attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
                self.delay.saturating_mul(factor)
            }
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, rotation: &dyn KeyRotation, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Request(err)) => {
                    if self.retry_on == RetryOn::OverloadedOnly && !is_overloaded(&err) {
                        return Err(SiteGenError::transient(format!("{}: {:#}", label, err)).into());
                    }
                    warn!(
                        "{}: request failed (attempt {}/{}): {:#}",
                        label, attempt, max_attempts, err
                    );
                    if self.rotate_credentials && attempt < max_attempts && rotation.rotate() {
                        info!("{}: retrying with another credential", label);
                    }
                    last_error = format!("{:#}", err);
                }
                Err(AttemptError::Output(reason)) => {
                    if self.retry_on == RetryOn::OverloadedOnly {
                        return Err(SiteGenError::structural(format!("{}: {}", label, reason)).into());
                    }
                    warn!(
                        "{}: unusable output (attempt {}/{}): {}",
                        label, attempt, max_attempts, reason
                    );
                    last_error = reason;
                }
            }

            if attempt < max_attempts {
                let pause = self.delay_for(attempt);
                if !pause.is_zero() {
                    info!("{}: waiting {:?} before retrying", label, pause);
                    tokio::time::sleep(pause).await;
                }
            }
        }

        Err(SiteGenError::transient(format!(
            "{} failed after {} attempts: {}",
            label, max_attempts, last_error
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind, LlmHttpError};
    use crate::llm::rotation::NoRotation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRotation(AtomicUsize);

    impl KeyRotation for CountingRotation {
        fn rotate(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn quick(retry_on: RetryOn) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            rotate_credentials: true,
            retry_on,
        }
    }

    fn overloaded() -> anyhow::Error {
        LlmHttpError {
            provider: "Gemini",
            status: 503,
            body: "UNAVAILABLE".to_string(),
        }
        .into()
    }

    #[test]
    fn test_delay_schedule() {
        let fixed = RetryPolicy::default();
        assert_eq!(fixed.delay_for(1), Duration::from_secs(5));
        assert_eq!(fixed.delay_for(3), Duration::from_secs(5));

        let exp = RetryPolicy {
            delay: Duration::from_secs(10),
            backoff: Backoff::Exponential,
            ..RetryPolicy::default()
        };
        assert_eq!(exp.delay_for(1), Duration::from_secs(10));
        assert_eq!(exp.delay_for(2), Duration::from_secs(20));
        assert_eq!(exp.delay_for(3), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_request_failure_rotates_then_succeeds() {
        let rotation = CountingRotation(AtomicUsize::new(0));
        let result = quick(RetryOn::AnyFailure)
            .run(&rotation, "page", |attempt| async move {
                if attempt < 3 {
                    Err(AttemptError::Request(anyhow::anyhow!("connection reset")))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
        assert_eq!(rotation.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_output_failure_does_not_rotate() {
        let rotation = CountingRotation(AtomicUsize::new(0));
        let result: Result<()> = quick(RetryOn::AnyFailure)
            .run(&rotation, "page", |_| async {
                Err(AttemptError::Output("no html".to_string()))
            })
            .await;
        let err = result.unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Transient));
        assert!(err.to_string().contains("after 3 attempts"));
        assert_eq!(rotation.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = quick(RetryOn::AnyFailure)
            .run(&NoRotation, "page", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Request(anyhow::anyhow!("boom"))) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_overloaded_only_aborts_on_generic_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = quick(RetryOn::OverloadedOnly)
            .run(&NoRotation, "plans", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Request(anyhow::anyhow!("invalid argument"))) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overloaded_only_retries_overloaded() {
        let calls = AtomicUsize::new(0);
        let result = quick(RetryOn::OverloadedOnly)
            .run(&NoRotation, "plans", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        Err(AttemptError::Request(overloaded()))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overloaded_only_output_error_is_structural() {
        let result: Result<()> = quick(RetryOn::OverloadedOnly)
            .run(&NoRotation, "plans", |_| async {
                Err(AttemptError::Output("not json".to_string()))
            })
            .await;
        assert_eq!(error_kind(&result.unwrap_err()), Some(ErrorKind::Structural));
    }
}
