//! Installer codecs (C5).
//!
//! Every variant ends with `dst` holding a single executable file, mode
//! `0750`/`0755` depending on layout. `zip`/`tgz`/`tbz`/`tarxz` walk
//! archive entries and extract the first one whose rendered name matches
//! the distribution's binary-pattern list; `gzip`/`xz` decompress a single
//! member whole; `direct` just moves the downloaded file into place.

use std::fs::File;
use std::io::{self, Read};

use bzip2::read::BzDecoder;
use camino::Utf8Path;
use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use crate::catalog::template::TemplateContext;
use crate::error::BinenvError;
use crate::layout::set_executable;

#[derive(Debug, Clone)]
pub enum InstallStrategy {
    Direct,
    Zip { binaries: Vec<String> },
    Tgz { binaries: Vec<String> },
    Tbz { binaries: Vec<String> },
    TarXz { binaries: Vec<String> },
    Gzip,
    Xz,
}

impl InstallStrategy {
    pub fn install(
        &self,
        distribution: &str,
        version_label: &str,
        src: &Utf8Path,
        dst: &Utf8Path,
        mode: u32,
        ctx: &TemplateContext,
    ) -> Result<(), BinenvError> {
        let io_err = |source: io::Error| BinenvError::IoError {
            path: src.to_path_buf(),
            source,
        };

        match self {
            InstallStrategy::Direct => {
                std::fs::rename(src, dst).or_else(|_| std::fs::copy(src, dst).map(|_| ()))
                    .map_err(io_err)?;
            }
            InstallStrategy::Gzip => {
                let f = File::open(src).map_err(io_err)?;
                extract_single_stream(GzDecoder::new(f), dst)?;
            }
            InstallStrategy::Xz => {
                let f = File::open(src).map_err(io_err)?;
                extract_single_stream(XzDecoder::new(f), dst)?;
            }
            InstallStrategy::Zip { binaries } => {
                extract_from_zip(distribution, version_label, src, dst, binaries, ctx)?;
            }
            InstallStrategy::Tgz { binaries } => {
                let f = File::open(src).map_err(io_err)?;
                let tar = tar::Archive::new(GzDecoder::new(f));
                extract_from_tar(distribution, version_label, tar, dst, binaries, ctx)?;
            }
            InstallStrategy::Tbz { binaries } => {
                let f = File::open(src).map_err(io_err)?;
                let tar = tar::Archive::new(BzDecoder::new(f));
                extract_from_tar(distribution, version_label, tar, dst, binaries, ctx)?;
            }
            InstallStrategy::TarXz { binaries } => {
                let f = File::open(src).map_err(io_err)?;
                let tar = tar::Archive::new(XzDecoder::new(f));
                extract_from_tar(distribution, version_label, tar, dst, binaries, ctx)?;
            }
        }

        set_executable(&dst.to_path_buf(), mode).map_err(|e| BinenvError::ArchiveError(e.to_string()))
    }
}

fn extract_single_stream(mut reader: impl Read, dst: &Utf8Path) -> Result<(), BinenvError> {
    let mut out = File::create(dst).map_err(|source| BinenvError::IoError {
        path: dst.to_path_buf(),
        source,
    })?;
    io::copy(&mut reader, &mut out)
        .map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
    Ok(())
}

fn extract_from_tar<R: Read>(
    distribution: &str,
    version_label: &str,
    mut archive: tar::Archive<R>,
    dst: &Utf8Path,
    patterns: &[String],
    ctx: &TemplateContext,
) -> Result<(), BinenvError> {
    let entries = archive
        .entries()
        .map_err(|e| BinenvError::ArchiveError(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| BinenvError::ArchiveError(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        if ctx
            .match_filters(&name, patterns)
            .map_err(|e| BinenvError::ArchiveError(e.to_string()))?
        {
            let mut out = File::create(dst).map_err(|source| BinenvError::IoError {
                path: dst.to_path_buf(),
                source,
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
            return Ok(());
        }
    }

    Err(BinenvError::NoMatch {
        distribution: distribution.to_string(),
        version: version_label.to_string(),
    })
}

fn extract_from_zip(
    distribution: &str,
    version_label: &str,
    src: &Utf8Path,
    dst: &Utf8Path,
    patterns: &[String],
    ctx: &TemplateContext,
) -> Result<(), BinenvError> {
    let file = File::open(src).map_err(|source| BinenvError::IoError {
        path: src.to_path_buf(),
        source,
    })?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| BinenvError::ArchiveError(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if ctx
            .match_filters(&name, patterns)
            .map_err(|e| BinenvError::ArchiveError(e.to_string()))?
        {
            let mut out = File::create(dst).map_err(|source| BinenvError::IoError {
                path: dst.to_path_buf(),
                source,
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
            return Ok(());
        }
    }

    Err(BinenvError::NoMatch {
        distribution: distribution.to_string(),
        version: version_label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::remap::RemapTable;
    use crate::version::Version;
    use std::io::Write;
    use tempfile::tempdir;

    fn ctx() -> TemplateContext {
        TemplateContext::new(&Version::parse("1.5.7").unwrap(), &RemapTable::default())
    }

    #[test]
    fn direct_install_moves_file_into_place() {
        let dir = tempdir().unwrap();
        let src = Utf8Path::from_path(dir.path()).unwrap().join("src-bin");
        let dst = Utf8Path::from_path(dir.path()).unwrap().join("dst-bin");
        std::fs::write(&src, b"binary contents").unwrap();

        InstallStrategy::Direct
            .install("terraform", "1.5.7", &src, &dst, 0o750, &ctx())
            .unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"binary contents");
    }

    #[test]
    fn gzip_install_decompresses_single_member() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempdir().unwrap();
        let src = Utf8Path::from_path(dir.path()).unwrap().join("archive.gz");
        let dst = Utf8Path::from_path(dir.path()).unwrap().join("dst-bin");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"decompressed contents").unwrap();
        std::fs::write(&src, encoder.finish().unwrap()).unwrap();

        InstallStrategy::Gzip
            .install("terraform", "1.5.7", &src, &dst, 0o750, &ctx())
            .unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"decompressed contents");
    }

    #[test]
    fn zip_install_errors_with_no_match_when_no_entry_fits() {
        let dir = tempdir().unwrap();
        let src = Utf8Path::from_path(dir.path()).unwrap().join("archive.zip");
        let dst = Utf8Path::from_path(dir.path()).unwrap().join("dst-bin");

        let file = File::create(&src).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("README.md", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"not a binary").unwrap();
        writer.finish().unwrap();

        let strategy = InstallStrategy::Zip {
            binaries: vec!["^terraform$".to_string()],
        };
        let err = strategy
            .install("terraform", "1.5.7", &src, &dst, 0o750, &ctx())
            .unwrap_err();
        assert!(matches!(err, BinenvError::NoMatch { .. }));
    }
}
