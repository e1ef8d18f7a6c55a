// ABOUTME: Runs shell commands inside the PostgreSQL container
// ABOUTME: Defines the ProcessExecutor trait and a Docker-backed implementation

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;
use which::which;

/// Container started by the current dev services tooling
pub const CONTAINER_NAME: &str = "sentry-postgres-1";

/// Container name used by the older service-management tooling
pub const LEGACY_CONTAINER_NAME: &str = "sentry_postgres";

/// Exit code and combined stdout/stderr of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a command inside a named container
///
/// Implementations return `Err` only when the command could not be run at
/// all. A command that ran and failed is reported through
/// [`ExecOutput::exit_code`].
pub trait ProcessExecutor {
    fn run(&self, container: &str, command: &str) -> Result<ExecOutput>;
}

impl<T: ProcessExecutor + ?Sized> ProcessExecutor for &T {
    fn run(&self, container: &str, command: &str) -> Result<ExecOutput> {
        (**self).run(container, command)
    }
}

/// Pick the container to run commands in
///
/// An explicit name wins. Otherwise the current container name is tried
/// first, then the legacy one.
pub fn resolve_container<F>(explicit: Option<&str>, mut is_running: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    if let Some(name) = explicit {
        if !is_running(name)? {
            bail!("Container '{}' is not running", name);
        }
        return Ok(name.to_string());
    }

    for name in [CONTAINER_NAME, LEGACY_CONTAINER_NAME] {
        if is_running(name)? {
            tracing::debug!("Using database container '{}'", name);
            return Ok(name.to_string());
        }
        tracing::debug!("Container '{}' is not running", name);
    }

    bail!(
        "Could not find a running PostgreSQL container (tried '{}' and '{}').\n\
         \n\
         Start the development services first, or pass --container with the\n\
         name of the container running PostgreSQL.",
        CONTAINER_NAME,
        LEGACY_CONTAINER_NAME
    )
}

/// Runs commands through `docker exec <container> bash -c <command>`
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    docker: PathBuf,
}

impl DockerExecutor {
    pub fn new() -> Result<Self> {
        let docker = which("docker").context(
            "Failed to find the docker CLI. Is Docker installed?\n\
             Install with:\n\
             - Ubuntu/Debian: sudo apt-get install docker.io\n\
             - macOS: brew install --cask docker",
        )?;
        Ok(Self { docker })
    }

    /// Whether a container with this name exists and is running
    pub fn is_running(&self, container: &str) -> Result<bool> {
        let output = Command::new(&self.docker)
            .args(["inspect", "--format", "{{.State.Running}}", container])
            .output()
            .context("Failed to execute docker inspect")?;

        if !output.status.success() {
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    pub fn resolve_container(&self, explicit: Option<&str>) -> Result<String> {
        resolve_container(explicit, |name| self.is_running(name))
    }
}

impl ProcessExecutor for DockerExecutor {
    fn run(&self, container: &str, command: &str) -> Result<ExecOutput> {
        let output = Command::new(&self.docker)
            .args(["exec", container, "bash", "-c", command])
            .output()
            .with_context(|| format!("Failed to execute docker exec in '{}'", container))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}
