//! Checksum verification hook (C5 supplement, SPEC_FULL.md §4.13).
//!
//! Resolves spec.md §9's open question ("no cryptographic verification ...
//! is specified. This is a real gap"): a catalog entry may carry an
//! optional `checksum` descriptor naming a digest algorithm and a URL
//! template for a sidecar manifest. When present, the orchestrator calls
//! [`verify`] after C4 fetch and before C5 install; a mismatch fails the
//! install before any archive extraction happens. No entry in the curated
//! catalog sets this today, so the hook is inert until an author opts in.

use anyhow::Context as _;
use camino::Utf8Path;
use reqwest::Client;
use sha2::{Digest as _, Sha256};

use crate::catalog::template::TemplateContext;
use crate::catalog::{ChecksumAlgorithm, ChecksumSpec};
use crate::error::BinenvError;

/// Fetch the expected digest named by `spec.url_template` and compare it
/// against `artifact`'s computed digest. The manifest is expected to be a
/// sidecar whose first whitespace-separated token is the hex digest (the
/// common `<artifact>.sha256` convention), not a multi-file manifest.
pub async fn verify(
    spec: &ChecksumSpec,
    client: &Client,
    distribution: &str,
    version_label: &str,
    artifact: &Utf8Path,
    ctx: &TemplateContext,
) -> Result<(), BinenvError> {
    let Some(template) = &spec.url_template else {
        tracing::debug!("checksum spec for {distribution} has no url_template, skipping verification");
        return Ok(());
    };

    let url = ctx.render(template)?;
    let expected = fetch_expected_digest(client, &url)
        .await
        .map_err(|e| BinenvError::ArchiveError(format!("unable to fetch checksum manifest {url}: {e}")))?;
    let actual = digest_file(spec.algorithm, artifact).map_err(|e| BinenvError::ArchiveError(e.to_string()))?;

    if !expected.eq_ignore_ascii_case(&actual) {
        tracing::warn!(
            "checksum mismatch for {distribution} {version_label}: expected {expected}, got {actual}"
        );
        return Err(BinenvError::ChecksumMismatch {
            distribution: distribution.to_string(),
            version: version_label.to_string(),
        });
    }

    Ok(())
}

fn digest_file(algorithm: ChecksumAlgorithm, path: &Utf8Path) -> anyhow::Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha256 => {
            let bytes = std::fs::read(path).with_context(|| format!("unable to read {path}"))?;
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            Ok(hex::encode(hasher.finalize()))
        }
    }
}

async fn fetch_expected_digest(client: &Client, url: &str) -> anyhow::Result<String> {
    let body = client
        .get(url)
        .send()
        .await
        .context("unable to request checksum manifest")?
        .error_for_status()
        .context("checksum manifest fetch returned an error status")?
        .text()
        .await
        .context("unable to read checksum manifest body")?;

    body.split_whitespace()
        .next()
        .map(str::to_string)
        .context("checksum manifest was empty")
}
