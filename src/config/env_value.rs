// ABOUTME: Values of the config `env` section handed to deploy scripts.
// ABOUTME: Each is a literal or a lookup of a variable in rigger's own environment.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// One entry of the `env` section.
///
/// ```yaml
/// env:
///   STAGE: prod                    # literal
///   TOKEN: { env: DEPLOY_TOKEN }   # required lookup
///   REGION: { env: AWS_REGION, default: eu-west-1 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// Resolve the value configured under `key` against the process
    /// environment.
    pub fn resolve(&self, key: &str) -> Result<String> {
        self.resolve_with(key, |var| std::env::var(var).ok())
    }

    /// Resolve the value configured under `key`, looking variables up
    /// through `lookup`.
    pub fn resolve_with(&self, key: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        match self {
            EnvValue::Literal(value) => Ok(value.clone()),
            EnvValue::FromEnv { var, default } => lookup(var)
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar {
                    key: key.to_string(),
                    var: var.clone(),
                }),
        }
    }
}

/// Resolve every entry of an `env` section.
///
/// Keys are visited in sorted order so the reported missing variable does
/// not depend on hash order.
pub fn resolve_env(map: &HashMap<String, EnvValue>) -> Result<HashMap<String, String>> {
    map.iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(key, value)| value.resolve(key).map(|resolved| (key.clone(), resolved)))
        .collect()
}
