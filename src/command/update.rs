use std::time::Duration;

use anyhow::Result;

use crate::command::Context;
use crate::orchestrator::{self, UpdateMode};

const DEFAULT_CACHE_SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/devops-works/binenv/master/definitions/cache.json";

/// `update [-d <distribution>]... [--all] [--nocache] [--concurrency N]`
#[derive(Debug, clap::Parser)]
pub struct UpdateCmd {
    /// Restrict the refresh to these distributions (local mode only).
    #[clap(long = "distributions", short = 'd')]
    distributions: Vec<String>,

    /// Refresh every distribution (the default when no distributions are named).
    #[clap(long, short = 'a')]
    all: bool,

    /// Query each distribution's lister directly instead of downloading a
    /// prebuilt cache snapshot.
    #[clap(long, short = 'f')]
    nocache: bool,

    /// Worker pool size for local mode.
    #[clap(long, short = 'c', default_value_t = 8)]
    concurrency: usize,
}

impl UpdateCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let catalog = ctx.load_catalog().await?;
        let mut cache = ctx.load_cache();

        let mode = if self.nocache {
            UpdateMode::Local
        } else {
            UpdateMode::Cache {
                url: DEFAULT_CACHE_SNAPSHOT_URL.to_string(),
            }
        };

        let filter = if self.all || self.distributions.is_empty() {
            None
        } else {
            Some(self.distributions.clone())
        };

        let failures = orchestrator::update(
            &catalog,
            &mut cache,
            &ctx.client,
            mode,
            filter.as_deref(),
            self.concurrency,
            Duration::from_secs(1),
        )
        .await?;

        cache.save(&ctx.layout.cache_file())?;

        let (hard, soft): (Vec<_>, Vec<_>) = failures.into_iter().partition(|(_, e)| !e.is_soft());

        for (distribution, warning) in &soft {
            eprintln!("{distribution}: {warning}");
        }
        for (distribution, error) in &hard {
            eprintln!("{distribution}: {error}");
        }

        println!(
            "updated {} distribution(s), {} failure(s)",
            catalog.distributions().count(),
            hard.len()
        );

        anyhow::ensure!(hard.is_empty(), "one or more listers failed during update");
        Ok(())
    }
}
