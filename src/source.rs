// Source data acquisition: local files or HTTP(S) resources.
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Remote(String),
}

impl SourceLocation {
    /// `http://` and `https://` locations are fetched remotely; anything else
    /// is a filesystem path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceLocation::Remote(trimmed.to_string())
        } else {
            SourceLocation::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::File(path) => write!(f, "{}", path.display()),
            SourceLocation::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Fetch the raw bytes of a source.
pub async fn acquire(
    location: &SourceLocation,
    http: &reqwest::Client,
) -> Result<Vec<u8>, SourceError> {
    match location {
        SourceLocation::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.display().to_string(),
                    source,
                })
        }
        SourceLocation::Remote(url) => {
            let http_err = |source| SourceError::Http {
                url: url.clone(),
                source,
            };
            let response = http.get(url).send().await.map_err(http_err)?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    url: url.clone(),
                    status,
                });
            }
            let bytes = response.bytes().await.map_err(http_err)?;
            Ok(bytes.to_vec())
        }
    }
}
