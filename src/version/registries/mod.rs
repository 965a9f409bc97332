//! Registry implementations for fetching image versions

pub mod docker_hub;

pub use docker_hub::DockerHubRegistry;
