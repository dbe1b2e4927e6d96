//! Template engine (C1).
//!
//! Renders catalog-supplied URL and binary-pattern templates against a
//! per-install context, and matches archive entry names against rendered
//! patterns (spec.md §4.1).

use regex::Regex;
use tera::{Context, Tera};

use crate::catalog::remap::RemapTable;
use crate::error::BinenvError;
use crate::version::Version;

/// Substitution context for one render: `{OS, Arch, Version, VersionMajor,
/// VersionMinor, VersionPatch, NakedVersion, ExeExtension}`.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub os: String,
    pub arch: String,
    pub version: String,
    pub version_major: String,
    pub version_minor: String,
    pub version_patch: String,
    pub naked_version: String,
    pub exe_extension: String,
}

impl TemplateContext {
    pub fn new(version: &Version, remap: &RemapTable) -> Self {
        let os = remap.interpolate(&crate::catalog::remap::canonical_os());
        let arch = remap.interpolate(&crate::catalog::remap::canonical_arch());
        let exe_extension = if crate::catalog::remap::canonical_os() == "windows" {
            ".exe"
        } else {
            ""
        };

        Self {
            os,
            arch,
            version: version.canonical(),
            version_major: version.major().to_string(),
            version_minor: version.minor().to_string(),
            version_patch: version.patch().to_string(),
            naked_version: version.canonical(),
            exe_extension: exe_extension.to_string(),
        }
    }

    fn tera_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("OS", &self.os);
        ctx.insert("Arch", &self.arch);
        ctx.insert("Version", &self.version);
        ctx.insert("VersionMajor", &self.version_major);
        ctx.insert("VersionMinor", &self.version_minor);
        ctx.insert("VersionPatch", &self.version_patch);
        ctx.insert("NakedVersion", &self.naked_version);
        ctx.insert("ExeExtension", &self.exe_extension);
        ctx
    }

    /// Substitute placeholders in `template`.
    pub fn render(&self, template: &str) -> Result<String, BinenvError> {
        Tera::one_off(template, &self.tera_context(), false)
            .map_err(|e| BinenvError::TemplateError(format!("{template}: {e}")))
    }

    /// Render each of `patterns`, compile each rendered form as a regex, and
    /// test whether any matches `path`. Archives commonly wrap their
    /// payload in a top-level directory, so when `path` contains `/` the
    /// first path component is stripped before matching.
    pub fn match_filters(&self, path: &str, patterns: &[String]) -> Result<bool, BinenvError> {
        let stripped = match path.split_once('/') {
            Some((_, rest)) => rest,
            None => path,
        };

        for pattern in patterns {
            let rendered = self.render(pattern)?;
            let re = Regex::new(&rendered)
                .map_err(|e| BinenvError::TemplateError(format!("{rendered}: {e}")))?;
            if re.is_match(stripped) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
