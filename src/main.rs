use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use gemfile_archiver::archive::Reconciler;
use gemfile_archiver::config::{self, ArchiveConfig};
use gemfile_archiver::container::{ContainerRuntime, DockerCli, Extractor, ImageJanitor};
use gemfile_archiver::logging;
use gemfile_archiver::pipeline::{self, ExtractAllOptions};
use gemfile_archiver::version::registries::DockerHubRegistry;
use gemfile_archiver::version::registry::Registry;

#[derive(Parser)]
#[command(name = "gemfile-archiver")]
#[command(version, about = "Archive Gemfile and Gemfile.lock from versioned container images")]
struct Cli {
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Image repository, e.g. metanorma/metanorma
    #[arg(long, global = true)]
    repository: Option<String>,

    /// Registry API base URL
    #[arg(long, global = true)]
    registry_url: Option<String>,

    /// Directory holding the v<version> directories
    #[arg(long, global = true)]
    archive_root: Option<PathBuf>,

    /// Index file, defaults to <archive-root>/index.yaml
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Kill a pull or probe run after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write JSON logs to the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every release version published upstream
    List,
    /// Extract the Gemfile pair of one version
    Extract { version: String },
    /// Extract every upstream version missing from the archive
    ExtractAll {
        /// Remove stale images afterwards, keeping the newest
        #[arg(long)]
        cleanup: bool,
        /// Do not regenerate the index afterwards
        #[arg(long)]
        skip_index: bool,
    },
    /// Regenerate the index from the archive and the registry
    Index,
    /// Remove local images of the repository except the newest
    Cleanup,
}

impl Cli {
    fn archive_config(&self) -> anyhow::Result<ArchiveConfig> {
        let mut config = match &self.config {
            Some(path) => ArchiveConfig::from_file(path)?,
            None => ArchiveConfig::default(),
        };

        if let Some(repository) = &self.repository {
            config.repository = repository.clone();
        }
        if let Some(registry_url) = &self.registry_url {
            config.registry_url = registry_url.clone();
        }
        if let Some(archive_root) = &self.archive_root {
            config.archive_root = archive_root.clone();
        }
        if let Some(index) = &self.index {
            config.index_path = Some(index.clone());
        }
        if let Some(timeout) = self.timeout {
            config.run_timeout_secs = Some(timeout);
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.then(config::log_path);
    let _guard = logging::init(&cli.log_level, log_file.as_deref())?;

    let config = Arc::new(cli.archive_config()?);

    // Every step is awaited in turn; nothing runs in parallel
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: Arc<ArchiveConfig>) -> anyhow::Result<()> {
    let registry: Arc<dyn Registry> = Arc::new(
        DockerHubRegistry::new(&config.registry_url, &config.repository)
            .with_page_size(config.page_size),
    );
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::from_config(&config));

    match command {
        Command::List => {
            for version in registry.fetch_all_versions().await? {
                println!("{}", version);
            }
        }
        Command::Extract { version } => {
            let extractor = Extractor::new(config, registry, runtime);
            extractor.extract_version(&version).await?;
        }
        Command::ExtractAll {
            cleanup,
            skip_index,
        } => {
            let options = ExtractAllOptions {
                cleanup,
                skip_index,
            };
            let report = pipeline::extract_all(config, registry, runtime, options).await?;
            println!(
                "Extracted {} versions, {} already present",
                report.batch.extracted.len(),
                report.batch.skipped.len()
            );
        }
        Command::Index => {
            let summary = Reconciler::new(config, registry).generate_index().await?;
            println!(
                "Indexed {} local versions ({} remote, {} missing, latest {})",
                summary.metadata.local_count,
                summary.metadata.remote_count,
                summary.missing_versions.len(),
                summary.metadata.latest_version.as_deref().unwrap_or("none")
            );
        }
        Command::Cleanup => {
            let report = ImageJanitor::new(config, runtime).cleanup_images().await?;
            println!(
                "Removed {} images, {} failed batches, kept {}",
                report.removed.len(),
                report.failed_batches,
                report.retained.as_deref().unwrap_or("none")
            );
        }
    }

    Ok(())
}
