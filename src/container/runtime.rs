//! Narrow interface to the container runtime

#[cfg(test)]
use mockall::automock;

use crate::container::error::RuntimeError;

/// Captured result of one runtime command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stdout: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr, for diagnostics
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Operations the archiver needs from a container runtime
///
/// A non-zero exit is reported through [`CommandOutput::status`], not as an
/// error. `Err` is reserved for commands that could not run at all.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pulls `image` (`repository:tag`)
    async fn pull_image(&self, image: &str) -> Result<CommandOutput, RuntimeError>;

    /// Runs `image` with its entrypoint replaced by `sh -c <script>`
    async fn run_with_script(&self, image: &str, script: &str)
    -> Result<CommandOutput, RuntimeError>;

    /// Removes every image in `images` with a single command
    async fn remove_images(&self, images: &[String]) -> Result<CommandOutput, RuntimeError>;

    /// Tags of the local images belonging to `repository`
    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError>;
}
