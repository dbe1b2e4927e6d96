use anyhow::Result;

use crate::command::Context;

/// `versions [<distribution>]`
#[derive(Debug, clap::Parser)]
pub struct VersionsCmd {
    /// Restrict the listing to this distribution. Without it, every
    /// distribution present in the cache is listed.
    distribution: Option<String>,
}

impl VersionsCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let cache = ctx.load_cache();

        match &self.distribution {
            Some(distribution) => {
                for version in cache.get(distribution) {
                    println!("{version}");
                }
            }
            None => {
                let mut distributions: Vec<&str> = cache.distributions().collect();
                distributions.sort_unstable();
                for distribution in distributions {
                    println!("{distribution}:");
                    for version in cache.get(distribution) {
                        println!("  {version}");
                    }
                }
            }
        }

        Ok(())
    }
}
