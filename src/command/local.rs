use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;

use crate::command::Context;
use crate::dispatch::resolve_for_dispatch;
use crate::lockfile::LockFile;
use crate::version::Version;

/// `local [<distribution> <version>] [--freeze]`
///
/// With a distribution/version pair, pins that exact version in this
/// directory's `.binenv.lock`, replacing any prior constraint for the
/// distribution and preserving every comment line (spec.md §4.8/§6).
/// With `--freeze`, prints the currently-resolved selection for every
/// installed distribution as a lock file to stdout instead of writing one.
#[derive(Debug, clap::Parser)]
pub struct LocalCmd {
    distribution: Option<String>,
    version: Option<String>,

    /// Emit the current selection as a lock file on stdout instead of pinning one distribution.
    #[clap(long, short = 'f')]
    freeze: bool,
}

impl LocalCmd {
    pub async fn exec(&self, ctx: &Context) -> Result<()> {
        if self.freeze {
            return self.freeze(ctx);
        }

        let distribution = self
            .distribution
            .as_deref()
            .context("a distribution is required unless --freeze is given")?;
        let version_raw = self
            .version
            .as_deref()
            .context("a version is required: `binenv local <distribution> <version>`")?;
        let version = Version::parse(version_raw)?;

        let lock_path = cwd()?.join(".binenv.lock");
        let mut lock = if lock_path.is_file() {
            LockFile::read_from(&lock_path)?
        } else {
            LockFile::default()
        };
        lock.set_exact(distribution, &version);
        lock.write_to(&lock_path)?;

        println!("pinned {distribution}={version} in {lock_path}");
        Ok(())
    }

    fn freeze(&self, ctx: &Context) -> Result<()> {
        let mut distributions: Vec<String> = ctx
            .layout
            .bindir
            .join("binaries")
            .read_dir()
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        distributions.sort();

        let mut lock = LockFile::default();
        for distribution in distributions {
            match resolve_for_dispatch(&distribution, &ctx.layout) {
                Ok(resolution) => lock.set_exact(&distribution, &resolution.version),
                Err(e) => tracing::warn!("skipping {distribution} in freeze: {e}"),
            }
        }

        print!("{}", lock.render());
        Ok(())
    }
}

fn cwd() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|p| anyhow::anyhow!("current directory {:?} is not UTF-8", p))
}
