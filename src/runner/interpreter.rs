// ABOUTME: Chooses how a resolved script is run on this host.
// ABOUTME: POSIX hosts use a shell, Windows hosts a cmd batch file.

use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempPath;
use tokio::process::Command;

const TEMP_PREFIX: &str = "rigger";

/// Shell used on POSIX hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_shell_program")]
    pub program: String,
    #[serde(default = "default_shell_args")]
    pub args: Vec<String>,
}

fn default_shell_program() -> String {
    "/bin/sh".to_string()
}

fn default_shell_args() -> Vec<String> {
    vec!["-e".to_string()]
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
            args: default_shell_args(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreter {
    Shell { program: String, args: Vec<String> },
    Batch,
}

impl Interpreter {
    /// Pick the interpreter for the host rigger runs on.
    pub fn for_host(shell: &ShellConfig) -> Self {
        if cfg!(windows) {
            Interpreter::Batch
        } else {
            Interpreter::Shell {
                program: shell.program.clone(),
                args: shell.args.clone(),
            }
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Interpreter::Shell { program, .. } => program,
            Interpreter::Batch => "cmd",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Interpreter::Shell { .. } => ".sh",
            Interpreter::Batch => ".bat",
        }
    }

    fn body(&self, text: &str) -> String {
        match self {
            Interpreter::Shell { .. } => text.to_string(),
            // Make the batch file report the last command's status.
            Interpreter::Batch => {
                let mut body = text.replace("\r\n", "\n").replace('\n', "\r\n");
                body.push_str("\r\nexit %ERRORLEVEL%");
                body
            }
        }
    }

    /// Write `text` to a temporary script inside `dir`.
    ///
    /// The file is deleted when the returned path is dropped.
    pub fn materialize(&self, dir: &Path, text: &str) -> std::io::Result<TempPath> {
        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(self.extension())
            .tempfile_in(dir)?;
        file.write_all(self.body(text).as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }

    /// Command running `script` with `cwd` as working directory.
    pub fn command(&self, script: &Path, cwd: &Path) -> Command {
        let mut command = match self {
            Interpreter::Shell { program, args } => {
                let mut command = Command::new(program);
                command.args(args).arg(script);
                command
            }
            Interpreter::Batch => {
                let mut command = Command::new("cmd");
                command.arg("/c").arg("call").arg(script);
                command
            }
        };
        command
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}
