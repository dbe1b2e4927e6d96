use anyhow::Result;
use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::command::Context;
use crate::opt::Opt;

/// `completion <shell>`
#[derive(Debug, clap::Parser)]
pub struct CompletionCmd {
    /// Shell to generate a completion script for.
    shell: Shell,
}

impl CompletionCmd {
    pub async fn exec(&self, _ctx: &Context) -> Result<()> {
        let mut command = Opt::command();
        let name = command.get_name().to_string();
        clap_complete::generate(self.shell, &mut command, name, &mut std::io::stdout());
        Ok(())
    }
}
