use std::time::Duration;

use thiserror::Error;

pub mod ops;
pub mod workflow;

pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;
pub type TokenResult<T> = std::result::Result<T, TokenError>;
pub type PublishResult<T> = std::result::Result<T, PublishError>;
pub type CleanupResult<T> = std::result::Result<T, CleanupError>;
pub type AddResult<T> = std::result::Result<T, AddError>;
pub type RemoveResult<T> = std::result::Result<T, RemoveError>;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("service account apply error: {0}")]
    AccountApply(#[source] kube::Error),

    #[error("cluster role binding apply error: {0}")]
    BindingApply(#[source] kube::Error),

    #[error("identity lookup error: {0}")]
    Lookup(#[source] kube::Error),
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("manager account not visible after {timeout:?}")]
    NotReady { timeout: Duration },

    #[error("token request error: {0}")]
    Request(#[source] kube::Error),

    #[error("token request encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("token request returned no token")]
    MissingToken,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("registration secret apply error: {0}")]
    Apply(#[source] kube::Error),
}

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("delete error: {0}")]
    Delete(#[source] kube::Error),

    #[error("removal verification error: {0}")]
    Verify(#[source] kube::Error),

    #[error("objects left behind after removal: {0}")]
    Lingering(String),
}

#[derive(Error, Debug)]
pub enum AddError {
    #[error("identity provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("token exchange error: {0}")]
    Token(#[from] TokenError),

    #[error("registration publish error: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Error, Debug)]
pub enum RemoveError {
    #[error("cleanup error: {0}")]
    Cleanup(#[from] CleanupError),
}
