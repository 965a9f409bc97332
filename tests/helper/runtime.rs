//! Container runtime test utilities

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use gemfile_archiver::container::error::RuntimeError;
use gemfile_archiver::container::probe::SENTINEL;
use gemfile_archiver::container::runtime::{CommandOutput, ContainerRuntime};

/// In-memory runtime: images are pulled into a local set, probed from
/// canned outputs, and removed again.
pub struct FakeRuntime {
    probes: HashMap<String, CommandOutput>,
    local_images: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
            local_images: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Image `tag` whose Gemfile lives in `dir`
    pub fn with_gemfile(mut self, tag: &str, dir: &str, manifest: &str, lock: &str) -> Self {
        let stdout = format!("GEMFILE_DIR={dir}\n{manifest}\n{SENTINEL}\n{lock}\n");
        self.probes
            .insert(image(tag), CommandOutput::success(stdout));
        self
    }

    /// Image `tag` without any Gemfile
    pub fn without_gemfile(mut self, tag: &str) -> Self {
        self.probes.insert(
            image(tag),
            CommandOutput::failure(1, "ERROR: No Gemfile found\n"),
        );
        self
    }

    /// Image already present locally before the run
    pub fn with_local_image(self, tag: &str) -> Self {
        self.local_images.lock().unwrap().insert(image(tag));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn local_images(&self) -> Vec<String> {
        self.local_images.lock().unwrap().iter().cloned().collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn image(tag: &str) -> String {
    format!("metanorma/metanorma:{tag}")
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image: &str) -> Result<CommandOutput, RuntimeError> {
        self.record(format!("pull {image}"));
        if !self.probes.contains_key(image) {
            return Ok(CommandOutput::failure(1, format!("manifest for {image} not found")));
        }
        self.local_images.lock().unwrap().insert(image.to_string());
        Ok(CommandOutput::success(""))
    }

    async fn run_with_script(
        &self,
        image: &str,
        _script: &str,
    ) -> Result<CommandOutput, RuntimeError> {
        self.record(format!("run {image}"));
        Ok(self
            .probes
            .get(image)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failure(125, "Unable to find image")))
    }

    async fn remove_images(&self, images: &[String]) -> Result<CommandOutput, RuntimeError> {
        self.record(format!("rmi {}", images.join(" ")));
        let mut local = self.local_images.lock().unwrap();
        for image in images {
            local.remove(image);
        }
        Ok(CommandOutput::success(""))
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError> {
        self.record(format!("images {repository}"));
        let prefix = format!("{repository}:");
        Ok(self
            .local_images
            .lock()
            .unwrap()
            .iter()
            .filter_map(|image| image.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}
