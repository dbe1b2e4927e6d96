#![deny(clippy::unwrap_used)]

use anyhow::Result;
use clap::Parser;

use binenv::command::Context;
use binenv::dispatch;
use binenv::layout::{Layout, LayoutOverrides};
use binenv::opt::Opt;
use binenv::SELF_NAME;

/// Entry point for both the CLI (`binenv install ...`) and the shim
/// (a symlink in `linkdir` named after a distribution, e.g. `terraform`),
/// distinguished by the basename the process was invoked under
/// (spec.md §4.11).
#[tokio::main]
async fn main() -> Result<()> {
    let invoked = dispatch::invoked_name();

    if invoked != SELF_NAME {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();

        let global = std::env::var("BINENV_GLOBAL").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let layout = Layout::resolve(global, LayoutOverrides::from_env())?;
        if let Err(e) = dispatch::exec_shim(&invoked, &layout) {
            eprintln!("binenv: {e}");
            std::process::exit(1);
        }
        unreachable!("exec_shim only returns on error");
    }

    let opt = Opt::parse();
    opt.init_tracing();

    let layout = opt.layout()?;
    let ctx = Context::new(layout);

    if let Err(e) = opt.cmd.exec(&ctx).await {
        eprintln!("binenv: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
