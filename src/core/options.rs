//! Purpose: Hold the per-dispatcher policy knobs.
//! Exports: `Policy`, `DispatchOptions`.
//! Role: Serializable configuration shared by library callers, config files, and CLI flags.
//! Invariants: Defaults are `race` with no deadline.
//! Invariants: Unknown config fields are rejected rather than ignored.
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Run every codec concurrently and keep the first success.
    #[default]
    Race,
    /// Try codecs in registration order and stop at the first success.
    Sequential,
}

impl Policy {
    pub fn as_str(self) -> &'static str {
        match self {
            Policy::Race => "race",
            Policy::Sequential => "sequential",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchOptions {
    pub policy: Policy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
