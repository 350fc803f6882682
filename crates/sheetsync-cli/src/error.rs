use thiserror::Error;

use crate::client::ApiClientError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
