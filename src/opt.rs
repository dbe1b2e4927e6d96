use camino::Utf8PathBuf;
use clap::Parser;
use std::io::IsTerminal as _;
use tracing_subscriber::EnvFilter;

use crate::command::Command;
use crate::layout::{Layout, LayoutOverrides};

#[derive(Debug, Parser)]
#[clap(
    name = "binenv",
    about = "Install, select, and run many versions of many binary distributions",
    version
)]
pub struct Opt {
    #[clap(subcommand)]
    pub cmd: Command,

    /// Use the global (host-wide) directory layout under /var and /usr/local/bin.
    #[clap(long, short = 'g', global = true, env = "BINENV_GLOBAL")]
    pub global: bool,

    /// Verbose operation: raise the log filter to debug.
    #[clap(long, short = 'v', global = true, env = "BINENV_VERBOSE")]
    pub verbose: bool,

    /// Override the directory binaries and the shim are stored under.
    #[clap(long, short = 'B', global = true, env = "BINENV_BINDIR")]
    pub bindir: Option<Utf8PathBuf>,

    /// Override the directory per-distribution symlinks are created under.
    #[clap(long, short = 'L', global = true, env = "BINENV_LINKDIR")]
    pub linkdir: Option<Utf8PathBuf>,

    /// Override the directory the version cache is stored under.
    #[clap(long, short = 'K', global = true, env = "BINENV_CACHEDIR")]
    pub cachedir: Option<Utf8PathBuf>,

    /// Override the directory the distribution catalog is stored under.
    #[clap(long, short = 'C', global = true, env = "BINENV_CONFDIR")]
    pub confdir: Option<Utf8PathBuf>,
}

impl Opt {
    pub fn init_tracing(&self) {
        let default_filter = if self.verbose { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_ansi(std::io::stderr().is_terminal())
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn layout(&self) -> anyhow::Result<Layout> {
        let overrides = LayoutOverrides {
            bindir: self.bindir.clone(),
            linkdir: self.linkdir.clone(),
            cachedir: self.cachedir.clone(),
            configdir: self.confdir.clone(),
        };
        Layout::resolve(self.global, overrides)
    }
}
