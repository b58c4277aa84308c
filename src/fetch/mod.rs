//! Read path for stored records: query construction plus transparent
//! pagination over the service's REST endpoints.

pub mod pagination;
pub mod query;

pub use pagination::PaginatedReader;
pub use query::LogQuery;

use crate::config::{ConfigError, ConnectionConfig};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid log query: {0}")]
    InvalidQuery(String),
    #[error("fetching logs failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fetches stored log content matching `query`, following the service's
/// pagination links until the content is exhausted.
///
/// The first page is requested before this returns, so a bad query or an
/// unreachable service fails here rather than on the first read.
pub async fn fetch(
    config: &ConnectionConfig,
    query: &LogQuery,
) -> Result<PaginatedReader, FetchError> {
    config.validate()?;
    query.validate()?;

    let base: Url = config.base_url.parse().map_err(|err| {
        FetchError::Config(ConfigError::InvalidUrl(format!(
            "invalid base URL '{}': {err}",
            config.base_url
        )))
    })?;
    let url = query.to_url(&base)?;
    let http = config.http_client()?;
    let headers = config.credential_headers()?;
    PaginatedReader::start(http, headers, url).await
}
