//! Distinguishable error kinds for the core.
//!
//! Most call sites propagate with `anyhow::Result` and `?`, exactly as the
//! rest of the crate does. `BinenvError` exists for the subset of failures
//! that callers must branch on: soft failures that a batch operation should
//! log and continue past, versus hard failures that should abort the
//! current item (or, on the shim path, the whole process).

use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BinenvError {
    #[error("unknown distribution '{0}'")]
    UnknownDistribution(String),

    #[error("distribution '{distribution}' is not supported on {os}/{arch}")]
    UnsupportedPlatform {
        distribution: String,
        os: String,
        arch: String,
    },

    #[error("{distribution} {version} is already installed")]
    AlreadyInstalled { distribution: String, version: String },

    #[error("no stable version is available for '{0}'")]
    NoStableVersion(String),

    #[error("unable to fetch {distribution} {version}: {message}")]
    FetchError {
        distribution: String,
        version: String,
        message: String,
    },

    #[error("unable to extract archive: {0}")]
    ArchiveError(String),

    #[error("no file in the archive matched the binary pattern for {distribution} {version}")]
    NoMatch { distribution: String, version: String },

    #[error("no installed version of '{distribution}' satisfies '{constraint}'")]
    Unsatisfiable {
        distribution: String,
        constraint: String,
    },

    #[error("rate limited by {provider}, retry after {retry_after}")]
    RateLimited {
        provider: String,
        retry_after: String,
    },

    #[error("rate limit for {provider} is close to exhaustion ({remaining} remaining)")]
    RateLimitClose { provider: String, remaining: i64 },

    #[error("template error: {0}")]
    TemplateError(String),

    #[error("downloaded artifact for {distribution} {version} failed checksum verification")]
    ChecksumMismatch { distribution: String, version: String },

    #[error("i/o error at {path}: {source}")]
    IoError {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BinenvError {
    /// `true` for kinds that a batch operation should log and continue past.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            BinenvError::AlreadyInstalled { .. }
                | BinenvError::RateLimited { .. }
                | BinenvError::RateLimitClose { .. }
        )
    }
}
