use thiserror::Error;

use crate::config::ConfigError;
use crate::endpoint::EndpointError;
use crate::registrar::{AddError, RemoveError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cluster endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Cluster add error: {0}")]
    Add(#[from] AddError),

    #[error("Cluster remove error: {0}")]
    Remove(#[from] RemoveError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Typed manifests for the manager identity and the registration secret
pub mod api;
/// CLI surface and input validation
pub mod config;
/// Per-cluster API endpoints built from kubeconfig files
pub mod endpoint;
/// The add/remove workflow engine and its remote operations
pub mod registrar;

/// Log and trace integrations
pub mod telemetry;
