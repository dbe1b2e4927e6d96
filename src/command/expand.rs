use anyhow::Result;

use crate::command::Context;
use crate::dispatch::resolve_for_dispatch;

/// `expand <distribution>`
///
/// Resolves the same way shim dispatch would, but prints the binary path
/// and exits instead of replacing the process (spec.md §4.11).
#[derive(Debug, clap::Parser)]
pub struct ExpandCmd {
    distribution: String,
}

impl ExpandCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let resolution = resolve_for_dispatch(&self.distribution, &ctx.layout)?;
        let binary = ctx
            .layout
            .binary_path(&self.distribution, &resolution.version.canonical());
        println!("{binary}");
        Ok(())
    }
}
