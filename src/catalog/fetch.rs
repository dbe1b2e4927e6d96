//! Fetcher (C4).
//!
//! Given an ordered list of URL templates, render each against the install
//! context, try a GET, and take the first 2xx response. The response
//! stream is tee'd to an `indicatif` progress bar and a temp file; on
//! success the caller owns the returned path.

use anyhow::Context as _;
use camino::Utf8PathBuf;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::catalog::template::TemplateContext;
use crate::error::BinenvError;

#[derive(Debug, Clone)]
pub struct FetchStrategy {
    pub urls: Vec<String>,
    /// Name of the env var carrying a bearer token for private registries.
    pub auth_env: Option<String>,
}

impl FetchStrategy {
    pub async fn fetch(
        &self,
        client: &Client,
        distribution: &str,
        version_label: &str,
        ctx: &TemplateContext,
    ) -> anyhow::Result<Utf8PathBuf> {
        let mut last_error: Option<String> = None;

        for (i, template) in self.urls.iter().enumerate() {
            let url = match ctx.render(template) {
                Ok(u) => u,
                Err(e) => {
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            let mut request = client.get(&url);
            if let Some(env_name) = &self.auth_env {
                if let Ok(token) = std::env::var(env_name) {
                    request = request.header("Authorization", format!("token {token}"));
                }
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            if !response.status().is_success() {
                last_error = Some(format!("{url}: {}", response.status()));
                if i + 1 < self.urls.len() {
                    continue;
                }
                return Err(BinenvError::FetchError {
                    distribution: distribution.to_string(),
                    version: version_label.to_string(),
                    message: last_error.unwrap_or_default(),
                }
                .into());
            }

            return stream_to_temp_file(distribution, version_label, response).await;
        }

        Err(BinenvError::FetchError {
            distribution: distribution.to_string(),
            version: version_label.to_string(),
            message: last_error.unwrap_or_else(|| "no URL templates configured".to_string()),
        }
        .into())
    }
}

async fn stream_to_temp_file(
    distribution: &str,
    version_label: &str,
    response: reqwest::Response,
) -> anyhow::Result<Utf8PathBuf> {
    let total = response.content_length().unwrap_or(0);
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar.set_message(format!("fetching {distribution} {version_label}"));

    let file = tempfile::Builder::new()
        .prefix(&format!("binenv-{distribution}-{version_label}-"))
        .tempfile()
        .context("unable to create temp file for download")?;
    let (std_file, path) = file.keep().context("unable to persist temp file handle")?;
    let path =
        Utf8PathBuf::from_path_buf(path).map_err(|p| anyhow::anyhow!("temp path {:?} is not UTF-8", p))?;

    let mut out = tokio::fs::File::from_std(std_file);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("error while streaming download")?;
        out.write_all(&chunk).await.context("error writing to temp file")?;
        bar.inc(chunk.len() as u64);
    }
    out.flush().await.context("error flushing temp file")?;
    bar.finish_with_message(format!("fetched {distribution} {version_label}"));

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::remap::RemapTable;
    use crate::version::Version;

    #[test]
    fn render_failure_on_every_url_surfaces_last_error() {
        let ctx = TemplateContext::new(&Version::parse("1.5.7").unwrap(), &RemapTable::default());
        assert!(ctx.render("{{ NotAKey }}").is_err());
    }
}
