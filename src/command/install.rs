use anyhow::Result;
use colored::Colorize as _;

use crate::command::{parse_distribution_pairs, Context};
use crate::error::BinenvError;
use crate::orchestrator;

/// `install [--lock] [--dry-run] [<distribution> [<version>] ...]`
#[derive(Debug, clap::Parser)]
pub struct InstallCmd {
    /// Distributions (optionally followed by a version) to install, e.g.
    /// `terraform 1.5.7 kubectl`. A distribution with no version installs
    /// the highest non-prerelease cached candidate.
    pairs: Vec<String>,

    /// Install every distribution named in `.binenv.lock`, at the best
    /// version the cache has for its constraint.
    #[clap(long, short = 'l')]
    lock: bool,

    /// Simulate the install without downloading or writing anything.
    #[clap(long, short = 'n')]
    dry_run: bool,
}

impl InstallCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let cache = ctx.load_cache();
        let catalog = ctx.load_catalog().await?;

        if self.lock {
            let cwd = current_dir(ctx)?;
            let results =
                orchestrator::install_from_lock(&ctx.layout, &catalog, &cache, &ctx.client, &cwd, self.dry_run)
                    .await;
            if results.is_empty() {
                anyhow::bail!("no .binenv.lock found (or it is empty) in the current directory");
            }
            return report_batch(results);
        }

        if self.pairs.is_empty() {
            anyhow::bail!("specify at least one distribution, or pass --lock to install from .binenv.lock");
        }

        let pairs = parse_distribution_pairs(&self.pairs);
        let mut results = Vec::with_capacity(pairs.len());
        for (distribution, version) in pairs {
            let outcome = orchestrator::install(
                &ctx.layout,
                &catalog,
                &cache,
                &ctx.client,
                &distribution,
                version.as_deref(),
                self.dry_run,
            )
            .await;
            results.push((distribution, outcome));
        }
        report_batch(results)
    }
}

fn current_dir(_ctx: &Context) -> Result<camino::Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    camino::Utf8PathBuf::from_path_buf(cwd).map_err(|p| anyhow::anyhow!("current directory {:?} is not UTF-8", p))
}

/// Print one line per pair and fail the process if any hard error occurred,
/// per spec.md §7: soft failures (`AlreadyInstalled`) are logged and the
/// batch continues; the exit code reflects whether anything hard failed.
fn report_batch(results: Vec<(String, Result<orchestrator::InstallOutcome, BinenvError>)>) -> Result<()> {
    let mut any_hard_failure = false;

    for (distribution, result) in results {
        match result {
            Ok(outcome) => {
                println!(
                    "{}",
                    format!("installed {distribution} {}", outcome.version).green()
                );
                if let Some(message) = outcome.message {
                    println!("{message}");
                }
            }
            Err(e) if e.is_soft() => {
                println!("{}", format!("{distribution}: {e}").yellow());
            }
            Err(e) => {
                eprintln!("{}", format!("{distribution}: {e}").red());
                any_hard_failure = true;
            }
        }
    }

    anyhow::ensure!(!any_hard_failure, "one or more distributions failed to install");
    Ok(())
}
