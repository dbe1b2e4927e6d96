use anyhow::Result;
use reqwest::Client;

use completion::CompletionCmd;
use expand::ExpandCmd;
use install::InstallCmd;
use local::LocalCmd;
use search::SearchCmd;
use uninstall::UninstallCmd;
use update::UpdateCmd;
use upgrade::UpgradeCmd;
use version::VersionCmd;
use versions::VersionsCmd;

use crate::cache::Cache;
use crate::catalog::Catalog;
use crate::layout::Layout;

mod completion;
mod expand;
mod install;
mod local;
mod search;
mod uninstall;
mod update;
mod upgrade;
mod version;
mod versions;

#[derive(Debug, clap::Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Command {
    /// Install one or more distributions, or refresh from `.binenv.lock`.
    #[clap(display_order = 100, visible_alias = "i")]
    Install(InstallCmd),
    /// Uninstall a distribution, or one specific version of it.
    #[clap(display_order = 200)]
    Uninstall(UninstallCmd),
    /// Pin (or freeze) the version a distribution resolves to in this directory.
    #[clap(display_order = 300)]
    Local(LocalCmd),
    /// Search distribution names and descriptions in the catalog.
    #[clap(display_order = 400)]
    Search(SearchCmd),
    /// Refresh the cached list of available versions.
    #[clap(display_order = 500)]
    Update(UpdateCmd),
    /// Install the highest stable version for every installed distribution.
    #[clap(display_order = 600)]
    Upgrade(UpgradeCmd),
    /// List cached available versions for a distribution.
    #[clap(display_order = 700)]
    Versions(VersionsCmd),
    /// Print the resolved binary path for a distribution without executing it.
    #[clap(display_order = 800)]
    Expand(ExpandCmd),
    /// Print this binary's own version.
    #[clap(display_order = 900)]
    Version(VersionCmd),
    /// Generate a shell completion script.
    #[clap(display_order = 1000)]
    Completion(CompletionCmd),
}

impl Command {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        match self {
            Command::Install(cmd) => cmd.exec(ctx).await,
            Command::Uninstall(cmd) => cmd.exec(ctx).await,
            Command::Local(cmd) => cmd.exec(ctx).await,
            Command::Search(cmd) => cmd.exec(ctx).await,
            Command::Update(cmd) => cmd.exec(ctx).await,
            Command::Upgrade(cmd) => cmd.exec(ctx).await,
            Command::Versions(cmd) => cmd.exec(ctx).await,
            Command::Expand(cmd) => cmd.exec(ctx).await,
            Command::Version(cmd) => cmd.exec(ctx).await,
            Command::Completion(cmd) => cmd.exec(ctx).await,
        }
    }
}

/// Shared state built once in `main.rs` and threaded into every command.
/// Catalog/cache are loaded lazily since `version` and `completion` need
/// neither.
pub struct Context {
    pub layout: Layout,
    pub client: Client,
}

impl Context {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            client: Client::new(),
        }
    }

    pub fn load_cache(&self) -> Cache {
        Cache::load(&self.layout.cache_file())
    }

    pub async fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load_or_fetch(&self.layout.catalog_file(), &self.client, None).await
    }
}

/// Parse a flat list of install/uninstall tokens into `(distribution,
/// version)` pairs, where a token that parses as a [`crate::version::Version`]
/// is treated as the version for the distribution preceding it, and any
/// other token starts a new distribution (implicitly requesting its
/// highest stable candidate if no version token follows).
///
/// This sidesteps positional ambiguity ("is this token a version or the
/// next distribution name?") by reusing the same semver parser the rest
/// of the crate already has, rather than requiring a fixed arity per
/// distribution.
pub fn parse_distribution_pairs(tokens: &[String]) -> Vec<(String, Option<String>)> {
    let mut pairs = Vec::new();
    let mut iter = tokens.iter().peekable();

    while let Some(name) = iter.next() {
        let version = match iter.peek() {
            Some(next) if crate::version::Version::parse(next).is_ok() => {
                iter.next();
                Some((*next).clone())
            }
            _ => None,
        };
        pairs.push((name.clone(), version));
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_distribution_with_following_version_token() {
        let tokens = vec!["terraform".to_string(), "1.5.7".to_string(), "kubectl".to_string()];
        let pairs = parse_distribution_pairs(&tokens);
        assert_eq!(
            pairs,
            vec![
                ("terraform".to_string(), Some("1.5.7".to_string())),
                ("kubectl".to_string(), None),
            ]
        );
    }

    #[test]
    fn two_distributions_in_a_row_both_default_to_latest() {
        let tokens = vec!["terraform".to_string(), "kubectl".to_string()];
        let pairs = parse_distribution_pairs(&tokens);
        assert_eq!(
            pairs,
            vec![
                ("terraform".to_string(), None),
                ("kubectl".to_string(), None),
            ]
        );
    }
}
