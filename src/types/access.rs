// ABOUTME: Identity and capability names used by permission checks.
// ABOUTME: Both are opaque strings; the policy decides what they mean.

use serde::Deserialize;
use std::fmt;

/// Capability checked before a deploy script may run.
pub const DEFAULT_TRIGGER_CAPABILITY: &str = "run.update";

/// Who is asking, e.g. a user name or a service account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named permission such as `run.update`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn trigger() -> Self {
        Self::new(DEFAULT_TRIGGER_CAPABILITY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::trigger()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
