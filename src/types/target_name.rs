// ABOUTME: Display names for deploy targets and their filesystem-safe form.
// ABOUTME: A name must be non-empty; the sanitized form swaps spaces for underscores.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetNameError {
    #[error("deploy target name cannot be empty")]
    Empty,

    #[error("deploy target name cannot contain '{0}'")]
    InvalidChar(char),

    #[error("deploy target name cannot be '.' or '..'")]
    DotSegment,
}

/// A deploy target's display label, such as "Code Coverage".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetName(String);

impl TargetName {
    pub fn new(value: &str) -> Result<Self, TargetNameError> {
        if value.trim().is_empty() {
            return Err(TargetNameError::Empty);
        }

        // The sanitized name becomes a directory name.
        for c in value.chars() {
            if c == '/' || c == '\\' || c == '\0' {
                return Err(TargetNameError::InvalidChar(c));
            }
        }

        if value == "." || value == ".." {
            return Err(TargetNameError::DotSegment);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name with every space replaced by `_`.
    pub fn sanitized(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
