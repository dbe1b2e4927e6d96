//! Version lister (C3).
//!
//! Paginated REST listers for GitHub/GitLab releases, plus a trivial
//! static list. Grounded in the original's `internal/list/*.go`: same
//! `tag_name`/`name` field choice, same `Link: …rel="next"` pagination,
//! same rate-limit header inspection — reimplemented against `reqwest`
//! instead of raw `net/http`.

use regex::Regex;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::error::BinenvError;

/// Declarative lister configuration, one variant per catalog `type`.
#[derive(Debug, Clone)]
pub enum ListStrategy {
    GithubReleases {
        url: String,
        prefix: Option<String>,
        exclude: Option<String>,
        /// `"tag_name"` (default) or `"name"`.
        version_from: String,
        /// Name of the env var carrying a bearer token, if any.
        auth_env: Option<String>,
    },
    GitlabReleases {
        url: String,
        prefix: Option<String>,
        exclude: Option<String>,
        version_from: String,
        auth_env: Option<String>,
    },
    Static {
        versions: Vec<String>,
    },
}

/// Result of one `list()` call: whatever versions were retrieved before any
/// rate-limit signal, plus the signal itself if one fired. Both rate-limit
/// kinds are soft: the caller uses `versions` regardless of `warning`.
#[derive(Debug, Default)]
pub struct ListOutcome {
    pub versions: Vec<String>,
    pub warning: Option<BinenvError>,
}

#[derive(Debug, Deserialize)]
struct ReleaseItem {
    tag_name: String,
    name: Option<String>,
}

const LOW_WATER_MARK: i64 = 4;

impl ListStrategy {
    pub async fn list(&self, client: &Client) -> anyhow::Result<ListOutcome> {
        match self {
            ListStrategy::Static { versions } => Ok(ListOutcome {
                versions: versions.clone(),
                warning: None,
            }),
            ListStrategy::GithubReleases {
                url,
                prefix,
                exclude,
                version_from,
                auth_env,
            } => {
                paginate(client, "github", url, prefix.as_deref(), exclude.as_deref(), version_from, auth_env.as_deref())
                    .await
            }
            ListStrategy::GitlabReleases {
                url,
                prefix,
                exclude,
                version_from,
                auth_env,
            } => {
                paginate(client, "gitlab", url, prefix.as_deref(), exclude.as_deref(), version_from, auth_env.as_deref())
                    .await
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn paginate(
    client: &Client,
    provider: &str,
    base_url: &str,
    prefix: Option<&str>,
    exclude: Option<&str>,
    version_from: &str,
    auth_env: Option<&str>,
) -> anyhow::Result<ListOutcome> {
    let exclude_re = exclude.map(Regex::new).transpose()?;

    let mut versions = Vec::new();
    let mut next_url = Some(base_url.to_string());

    while let Some(url) = next_url.take() {
        let mut request = client.get(&url);
        if let Some(env_name) = auth_env {
            if let Ok(token) = std::env::var(env_name) {
                request = request.header("Authorization", format!("token {token}"));
            }
        }

        let response = request.send().await?.error_for_status()?;

        match rate_limit_signal(provider, &response) {
            Some(warning @ BinenvError::RateLimited { .. }) => {
                // Fully exhausted: stop without consuming this page, keep
                // whatever prior pages already contributed.
                return Ok(ListOutcome {
                    versions,
                    warning: Some(warning),
                });
            }
            Some(warning) => {
                let items: Vec<ReleaseItem> = response.json().await.unwrap_or_default();
                collect(&items, prefix, &exclude_re, version_from, &mut versions);
                return Ok(ListOutcome {
                    versions,
                    warning: Some(warning),
                });
            }
            None => {}
        }

        next_url = next_link(&response);

        let items: Vec<ReleaseItem> = response.json().await?;
        collect(&items, prefix, &exclude_re, version_from, &mut versions);
    }

    Ok(ListOutcome {
        versions,
        warning: None,
    })
}

fn collect(
    items: &[ReleaseItem],
    prefix: Option<&str>,
    exclude_re: &Option<Regex>,
    version_from: &str,
    out: &mut Vec<String>,
) {
    for item in items {
        let raw = if version_from == "name" {
            item.name.clone().unwrap_or_default()
        } else {
            item.tag_name.clone()
        };

        if let Some(re) = exclude_re {
            if re.is_match(&raw) {
                continue;
            }
        }

        match prefix {
            Some(p) if !p.is_empty() => {
                if let Some(stripped) = raw.strip_prefix(p) {
                    out.push(stripped.to_string());
                }
            }
            _ => out.push(raw),
        }
    }
}

/// Follow the `Link: <url>; rel="next"` header, as both GitHub and GitLab
/// REST APIs emit it.
fn next_link(response: &Response) -> Option<String> {
    let link = response.headers().get("link")?.to_str().ok()?;
    for part in link.split(',') {
        if part.contains("rel=\"next\"") {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            return Some(part[start..end].to_string());
        }
    }
    None
}

/// Inspect rate-limit headers; return a soft warning if we're at or below
/// the low-water mark (`RateLimitClose`) or fully exhausted (`RateLimited`).
fn rate_limit_signal(provider: &str, response: &Response) -> Option<BinenvError> {
    let headers = response.headers();
    let remaining: i64 = headers
        .get("x-ratelimit-remaining")
        .or_else(|| headers.get("ratelimit-remaining"))?
        .to_str()
        .ok()?
        .parse()
        .ok()?;

    if remaining == 0 {
        let reset = headers
            .get("x-ratelimit-reset")
            .or_else(|| headers.get("ratelimit-reset"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        return Some(BinenvError::RateLimited {
            provider: provider.to_string(),
            retry_after: reset.to_string(),
        });
    }

    if remaining <= LOW_WATER_MARK {
        return Some(BinenvError::RateLimitClose {
            provider: provider.to_string(),
            remaining,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_strips_prefix_and_applies_exclude() {
        let items = vec![
            ReleaseItem {
                tag_name: "v1.28.3".to_string(),
                name: None,
            },
            ReleaseItem {
                tag_name: "v1.28.0-rc.1".to_string(),
                name: None,
            },
        ];
        let exclude_re = Some(Regex::new("-rc").unwrap());
        let mut out = Vec::new();
        collect(&items, Some("v"), &exclude_re, "tag_name", &mut out);
        assert_eq!(out, vec!["1.28.3".to_string()]);
    }

    #[test]
    fn collect_reads_from_name_when_requested() {
        let items = vec![ReleaseItem {
            tag_name: "ignored".to_string(),
            name: Some("1.5.7".to_string()),
        }];
        let mut out = Vec::new();
        collect(&items, None, &None, "name", &mut out);
        assert_eq!(out, vec!["1.5.7".to_string()]);
    }
}
