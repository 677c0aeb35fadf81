// ABOUTME: Loads a deploy script from a snapshot and resolves its macros.
// ABOUTME: Read and substitution run as one unit wherever the snapshot lives.

mod macros;

pub use macros::substitute;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script \"{script}\" not found in {}", root.display())]
    NotFound { script: String, root: PathBuf },

    #[error("script \"{0}\" must be a relative path inside the workspace")]
    OutsideWorkspace(String),

    #[error("failed to read script {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("script resolution task failed: {0}")]
    Task(String),
}

/// Produces the literal text of a deploy script.
#[async_trait]
pub trait ScriptResolver: Send + Sync {
    /// Read `workspace_root/script_ref` and substitute macros from `env`.
    async fn resolve(
        &self,
        script_ref: &str,
        workspace_root: &Path,
        env: &HashMap<String, String>,
    ) -> Result<String, ScriptError>;
}

/// Resolves scripts on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScriptResolver;

#[async_trait]
impl ScriptResolver for LocalScriptResolver {
    async fn resolve(
        &self,
        script_ref: &str,
        workspace_root: &Path,
        env: &HashMap<String, String>,
    ) -> Result<String, ScriptError> {
        let script_ref = script_ref.to_string();
        let root = workspace_root.to_path_buf();
        let env = env.clone();

        tokio::task::spawn_blocking(move || load_and_substitute(&script_ref, &root, &env))
            .await
            .map_err(|e| ScriptError::Task(e.to_string()))?
    }
}

fn load_and_substitute(
    script_ref: &str,
    root: &Path,
    env: &HashMap<String, String>,
) -> Result<String, ScriptError> {
    let path = script_path(script_ref, root)?;

    if !path.is_file() {
        return Err(ScriptError::NotFound {
            script: script_ref.to_string(),
            root: root.to_path_buf(),
        });
    }

    let raw = std::fs::read(&path).map_err(|source| ScriptError::Read { path, source })?;
    let text = String::from_utf8_lossy(&raw);
    Ok(substitute(&text, env))
}

/// Join `script_ref` onto `root`, refusing anything that could leave it.
fn script_path(script_ref: &str, root: &Path) -> Result<PathBuf, ScriptError> {
    let relative = Path::new(script_ref);
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if script_ref.is_empty() || escapes {
        return Err(ScriptError::OutsideWorkspace(script_ref.to_string()));
    }

    Ok(root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_segments_are_refused() {
        let err = script_path("../secrets.sh", Path::new("/ws")).unwrap_err();
        assert!(matches!(err, ScriptError::OutsideWorkspace(_)));
    }

    #[test]
    fn absolute_paths_are_refused() {
        let err = script_path("/etc/passwd", Path::new("/ws")).unwrap_err();
        assert!(matches!(err, ScriptError::OutsideWorkspace(_)));
    }

    #[test]
    fn nested_relative_path_is_joined() {
        assert_eq!(
            script_path("bin/run.sh", Path::new("/ws")).unwrap(),
            PathBuf::from("/ws/bin/run.sh")
        );
    }
}
