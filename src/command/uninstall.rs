use anyhow::Result;
use std::io::Write as _;

use crate::command::Context;
use crate::orchestrator;

/// `uninstall <distribution> [<version>]`
#[derive(Debug, clap::Parser)]
pub struct UninstallCmd {
    distribution: String,
    /// Version to remove. If omitted, every installed version (and the
    /// symlink) is removed after typed confirmation.
    version: Option<String>,
}

impl UninstallCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        match &self.version {
            Some(version) => {
                orchestrator::uninstall(&ctx.layout, &self.distribution, Some(version), false)?;
                println!("uninstalled {} {}", self.distribution, version);
            }
            None => {
                if !confirm(&self.distribution)? {
                    anyhow::bail!("aborted: confirmation did not match '{}'", self.distribution);
                }
                orchestrator::uninstall(&ctx.layout, &self.distribution, None, true)?;
                println!("uninstalled all versions of {}", self.distribution);
            }
        }
        Ok(())
    }
}

/// Require the user to type the distribution's name back, per spec.md
/// §4.10 ("require interactive confirmation (the user types the
/// distribution's name)").
fn confirm(distribution: &str) -> Result<bool> {
    print!("this will remove every installed version of '{distribution}'. Type '{distribution}' to confirm: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim() == distribution)
}
