use anyhow::Result;

use crate::command::Context;

/// `version`
#[derive(Debug, clap::Parser)]
pub struct VersionCmd {}

impl VersionCmd {
    pub async fn exec(&self, _ctx: &Context) -> Result<()> {
        println!("binenv {}", env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}
