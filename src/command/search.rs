use anyhow::Result;
use colored::Colorize as _;

use crate::command::Context;

/// `search [term] [--wide]`
#[derive(Debug, clap::Parser)]
pub struct SearchCmd {
    /// Only list distributions whose name or description contains this term.
    term: Option<String>,

    /// Also print each distribution's description and URL.
    #[clap(long, short = 'w')]
    wide: bool,
}

impl SearchCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        let catalog = ctx.load_catalog().await?;
        let term = self.term.as_deref().unwrap_or("").to_lowercase();

        let mut matches: Vec<&str> = catalog
            .distributions()
            .filter(|name| {
                if term.is_empty() {
                    return true;
                }
                if name.to_lowercase().contains(&term) {
                    return true;
                }
                catalog
                    .get(name)
                    .and_then(|entry| entry.description.as_deref())
                    .is_some_and(|d| d.to_lowercase().contains(&term))
            })
            .collect();
        matches.sort_unstable();

        for name in matches {
            let entry = catalog.get(name).expect("listed distribution always resolves");
            let installed = !ctx.layout.installed_versions(name).is_empty();
            let label = if installed { name.green() } else { name.normal() };

            if self.wide {
                println!(
                    "{:<24} {}",
                    label,
                    entry.description.as_deref().unwrap_or("")
                );
            } else {
                println!("{label}");
            }
        }

        Ok(())
    }
}
