//! Subprocess execution for the external tools the pipeline drives.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A command to run to completion
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    removed_env: Vec<String>,
    redacted_env: Vec<String>,
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Whether the command exited with status zero
    pub success: bool,
    /// Exit code, if the process was not killed by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Both streams joined, stderr first, as shown in error messages
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (false, false) => format!("{stderr}\n{stdout}"),
            (false, true) => stderr.to_string(),
            (true, false) => stdout.to_string(),
            (true, true) => match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            },
        }
    }
}

impl ToolCommand {
    /// Start building a command for `program`
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            removed_env: Vec::new(),
            redacted_env: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Keep `key` from being inherited by the child
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.env.remove(&key);
        self.removed_env.push(key);
        self
    }

    /// Set an environment variable whose value must never be logged
    pub fn secret_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.redacted_env.push(key.clone());
        self.env.insert(key, value.into());
        self
    }

    /// Printable command line (program and arguments, no environment)
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion, capturing both output streams.
    ///
    /// A non-zero exit is not an error here; callers map it into their own
    /// step error with the captured diagnostics.
    pub async fn run(&self) -> std::io::Result<ToolOutput> {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if let Some(ref cwd) = self.cwd {
            command.current_dir(cwd);
        }
        for key in &self.removed_env {
            command.env_remove(key);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        log::debug!(
            "running `{}`{}{}",
            self.display(),
            self.cwd
                .as_ref()
                .map(|cwd| format!(" in {}", cwd.display()))
                .unwrap_or_default(),
            self.env_summary()
        );

        let output = command.output().await?;
        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        log::debug!("`{}` exited with {:?}", self.display(), result.code);
        Ok(result)
    }

    fn env_summary(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| {
                if self.redacted_env.contains(key) {
                    format!("{key}=***")
                } else {
                    format!("{key}={value}")
                }
            })
            .collect();
        parts.extend(self.removed_env.iter().map(|key| format!("-{key}")));
        if parts.is_empty() {
            return String::new();
        }
        format!(" with env [{}]", parts.join(", "))
    }
}


/// Stand-in executables for exercising the real steps in unit tests
#[cfg(all(test, unix))]
pub(crate) mod fake_tool {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable `sh` script named `name` into `dir`
    pub(crate) fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
