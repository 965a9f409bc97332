//! `docker` command line implementation of [`ContainerRuntime`]

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::config::{ArchiveConfig, DEFAULT_DOCKER_BINARY};
use crate::container::error::RuntimeError;
use crate::container::runtime::{CommandOutput, ContainerRuntime};

/// Drives the container runtime through its CLI, one blocking command at a time
pub struct DockerCli {
    program: String,
    timeout: Option<Duration>,
}

impl DockerCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            timeout: None,
        }
    }

    /// Applies to pulls and probe runs; removal and listing are never cut short
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(&config.docker_binary)
            .with_timeout(config.run_timeout_secs.map(Duration::from_secs))
    }

    async fn execute(&self, args: &[String], timed: bool) -> Result<CommandOutput, RuntimeError> {
        let subcommand = format!(
            "{} {}",
            self.program,
            args.first().map(String::as_str).unwrap_or_default()
        );
        debug!("Running {} ({} args)", subcommand, args.len());

        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let output = match self.timeout.filter(|_| timed) {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| RuntimeError::TimedOut {
                    command: subcommand.clone(),
                    timeout_secs: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|source| RuntimeError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_BINARY)
    }
}

fn pull_args(image: &str) -> Vec<String> {
    vec!["pull".to_string(), image.to_string()]
}

fn run_args(image: &str, script: &str) -> Vec<String> {
    ["run", "--rm", "--entrypoint", "sh", image, "-c", script]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn remove_args(images: &[String]) -> Vec<String> {
    let mut args = vec!["rmi".to_string(), "-f".to_string()];
    args.extend(images.iter().cloned());
    args
}

fn list_args(repository: &str) -> Vec<String> {
    ["images", repository, "--format", "{{.Tag}}"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// One tag per line; untagged images show up as `<none>`
fn parse_tag_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "<none>")
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerCli {
    async fn pull_image(&self, image: &str) -> Result<CommandOutput, RuntimeError> {
        self.execute(&pull_args(image), true).await
    }

    async fn run_with_script(
        &self,
        image: &str,
        script: &str,
    ) -> Result<CommandOutput, RuntimeError> {
        self.execute(&run_args(image, script), true).await
    }

    async fn remove_images(&self, images: &[String]) -> Result<CommandOutput, RuntimeError> {
        self.execute(&remove_args(images), false).await
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError> {
        let output = self.execute(&list_args(repository), false).await?;

        if !output.is_success() {
            return Err(RuntimeError::CommandFailed {
                command: format!("{} images {}", self.program, repository),
                status: output.status,
                output: output.combined(),
            });
        }

        Ok(parse_tag_list(&output.stdout))
    }
}
