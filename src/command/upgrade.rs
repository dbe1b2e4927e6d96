use anyhow::Result;

use crate::command::Context;
use crate::orchestrator;

/// `upgrade [--ignore-install-errors]`
#[derive(Debug, clap::Parser)]
pub struct UpgradeCmd {
    /// Keep upgrading remaining distributions after one fails, instead of stopping.
    #[clap(long, short = 'i')]
    ignore_install_errors: bool,
}

impl UpgradeCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let catalog = ctx.load_catalog().await?;
        let cache = ctx.load_cache();

        let report = orchestrator::upgrade(&ctx.layout, &catalog, &cache, &ctx.client, self.ignore_install_errors).await;

        for (distribution, version) in &report.upgraded {
            println!("upgraded {distribution} to {version}");
        }
        for distribution in &report.already_current {
            println!("{distribution} is already at the latest stable version");
        }
        for (distribution, error) in &report.failed {
            eprintln!("{distribution}: {error}");
        }

        anyhow::ensure!(report.failed.is_empty(), "one or more distributions failed to upgrade");
        Ok(())
    }
}
