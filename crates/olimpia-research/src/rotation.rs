//! Credential rotation for generation calls
//!
//! Keys are tried in order. Quota exhaustion moves on to the next key without
//! delay; any other failure stops the rotation unless the policy says to
//! keep going. When every key was
//! quota-limited and a final wait is configured, the first key gets one more
//! attempt after that wait.

use crate::api::TextGenerator;
use crate::error::GenerationError;
use std::time::Duration;
use tracing::{debug, warn};

/// One step of a rotation schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Call the generator with the key at this index
    Try(usize),
    /// Sleep before the steps that follow; only reached when every key so far
    /// was quota-limited
    Wait(Duration),
}

/// What to do with a reply the caller does not accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnReject {
    /// A reply ends the rotation whether or not it was usable
    Stop,
    /// Keep trying the remaining keys
    Continue,
}

/// What to do when a key fails with a non-quota error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFatal {
    Stop,
    /// Treat the key as unusable and try the next one
    Continue,
}

/// Rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub final_wait: Option<Duration>,
    pub on_reject: OnReject,
    pub on_fatal: OnFatal,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            final_wait: None,
            on_reject: OnReject::Stop,
            on_fatal: OnFatal::Stop,
        }
    }
}

impl RotationPolicy {
    pub fn with_final_wait(mut self, wait: Option<Duration>) -> Self {
        self.final_wait = wait;
        self
    }

    pub fn with_on_reject(mut self, on_reject: OnReject) -> Self {
        self.on_reject = on_reject;
        self
    }

    pub fn with_on_fatal(mut self, on_fatal: OnFatal) -> Self {
        self.on_fatal = on_fatal;
        self
    }

    /// The attempt schedule for `key_count` keys
    ///
    /// ```
    /// use olimpia_research::rotation::{RotationPolicy, Step};
    /// use std::time::Duration;
    ///
    /// let wait = Duration::from_secs(30);
    /// let plan = RotationPolicy::default().with_final_wait(Some(wait)).plan(2);
    /// assert_eq!(plan, vec![Step::Try(0), Step::Try(1), Step::Wait(wait), Step::Try(0)]);
    /// ```
    pub fn plan(&self, key_count: usize) -> Vec<Step> {
        let mut steps: Vec<Step> = (0..key_count).map(Step::Try).collect();
        if let (Some(wait), true) = (self.final_wait, key_count > 0) {
            steps.push(Step::Wait(wait));
            steps.push(Step::Try(0));
        }
        steps
    }
}

/// How a rotation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome<T> {
    /// A reply was accepted
    Accepted { value: T, key_index: usize },
    /// Replies came back but none was accepted
    Rejected,
    /// Every attempt hit a quota limit
    QuotaExhausted,
    /// A non-quota failure stopped the rotation
    Fatal(String),
    /// No keys to try
    NoCredentials,
}

impl<T> RotationOutcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Run `policy` over `keys`, returning the first reply `accept` maps to `Some`
pub async fn rotate<G, T, F>(
    generator: &G,
    prompt: &str,
    keys: &[String],
    policy: RotationPolicy,
    mut accept: F,
) -> RotationOutcome<T>
where
    G: TextGenerator + ?Sized,
    F: FnMut(&str) -> Option<T>,
{
    if keys.is_empty() {
        return RotationOutcome::NoCredentials;
    }

    let mut all_quota = true;
    let mut any_rejected = false;
    let mut last_fatal = None;

    for step in policy.plan(keys.len()) {
        match step {
            Step::Wait(wait) => {
                if !all_quota {
                    break;
                }
                warn!(wait_secs = wait.as_secs(), "Every key quota-limited, waiting before a final attempt");
                tokio::time::sleep(wait).await;
            }
            Step::Try(index) => match generator.generate(prompt, &keys[index]).await {
                Ok(reply) => {
                    if let Some(value) = accept(&reply) {
                        debug!(key_index = index, "Generation accepted");
                        return RotationOutcome::Accepted {
                            value,
                            key_index: index,
                        };
                    }
                    debug!(key_index = index, "Generation rejected");
                    all_quota = false;
                    any_rejected = true;
                    if policy.on_reject == OnReject::Stop {
                        return RotationOutcome::Rejected;
                    }
                }
                Err(GenerationError::QuotaExceeded(cause)) => {
                    warn!(key_index = index, %cause, "Key quota-limited, rotating");
                }
                Err(GenerationError::Fatal(cause)) => {
                    if policy.on_fatal == OnFatal::Stop {
                        warn!(key_index = index, %cause, "Generation failed, stopping rotation");
                        return RotationOutcome::Fatal(cause);
                    }
                    warn!(key_index = index, %cause, "Generation failed, rotating");
                    all_quota = false;
                    last_fatal = Some(cause);
                }
            },
        }
    }

    match (any_rejected, last_fatal) {
        (true, _) => RotationOutcome::Rejected,
        (false, Some(cause)) => RotationOutcome::Fatal(cause),
        (false, None) => RotationOutcome::QuotaExhausted,
    }
}
