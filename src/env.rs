// ABOUTME: Environment providers feeding macro substitution in deploy scripts.
// ABOUTME: Process env, fixed maps and layered combinations behind one trait.

use std::collections::HashMap;
use std::sync::Arc;

/// Supplies the variables available to `${VAR}` substitution.
pub trait EnvironmentProvider: Send + Sync {
    fn current(&self) -> HashMap<String, String>;
}

/// The environment of the rigger process itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn current(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn current(&self) -> HashMap<String, String> {
        self.vars.clone()
    }
}

/// Providers applied in order; later layers override earlier ones.
#[derive(Clone, Default)]
pub struct LayeredEnvironment {
    layers: Vec<Arc<dyn EnvironmentProvider>>,
}

impl LayeredEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, provider: Arc<dyn EnvironmentProvider>) -> Self {
        self.layers.push(provider);
        self
    }
}

impl std::fmt::Debug for LayeredEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredEnvironment")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl EnvironmentProvider for LayeredEnvironment {
    fn current(&self) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for layer in &self.layers {
            merged.extend(layer.current());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_win() {
        let base: StaticEnvironment = [("STAGE", "dev"), ("REGION", "eu")].into_iter().collect();
        let over: StaticEnvironment = [("STAGE", "prod")].into_iter().collect();

        let env = LayeredEnvironment::new()
            .layer(Arc::new(base))
            .layer(Arc::new(over))
            .current();

        assert_eq!(env.get("STAGE").map(String::as_str), Some("prod"));
        assert_eq!(env.get("REGION").map(String::as_str), Some("eu"));
    }

    #[test]
    fn process_environment_sees_set_vars() {
        temp_env::with_var("RIGGER_ENV_PROBE", Some("probe"), || {
            let env = ProcessEnvironment.current();
            assert_eq!(
                env.get("RIGGER_ENV_PROBE").map(String::as_str),
                Some("probe")
            );
        });
    }
}
