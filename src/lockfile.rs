//! Lock-file parser/solver (C8).
//!
//! `.binenv.lock` is UTF-8 text, one record per line, `#`-comments allowed.
//! A record is `<distribution><operator><version>[,<operator><version>...]`.

use std::fmt;

use anyhow::{Context as _, Result};
use camino::Utf8Path;

use crate::constraint::{env_override_var_name, split_distribution_and_expr, Constraint};
use crate::error::BinenvError;
use crate::version::Version;

/// A single line of a parsed lock file, preserving enough of its original
/// form to round-trip comments (spec.md §6: "Implementations MUST preserve
/// comment lines verbatim on rewrites").
#[derive(Debug, Clone)]
pub enum LockLine {
    Comment(String),
    Blank,
    Entry {
        distribution: String,
        constraint: Constraint,
    },
}

#[derive(Debug, Clone, Default)]
pub struct LockFile {
    pub lines: Vec<LockLine>,
}

impl LockFile {
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (lineno, raw) in contents.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                lines.push(LockLine::Blank);
                continue;
            }
            if trimmed.starts_with('#') {
                lines.push(LockLine::Comment(raw.to_string()));
                continue;
            }
            let (distribution, expr) = split_distribution_and_expr(trimmed)
                .with_context(|| format!("lock file line {}: missing operator in '{trimmed}'", lineno + 1))?;
            let constraint = Constraint::parse(expr)
                .with_context(|| format!("lock file line {}: invalid constraint '{expr}'", lineno + 1))?;
            lines.push(LockLine::Entry {
                distribution: distribution.to_string(),
                constraint,
            });
        }
        Ok(Self { lines })
    }

    pub fn read_from(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read lock file {path}"))?;
        Self::parse(&contents)
    }

    pub fn entry_for(&self, distribution: &str) -> Option<&Constraint> {
        self.lines.iter().find_map(|l| match l {
            LockLine::Entry {
                distribution: d,
                constraint,
            } if d == distribution => Some(constraint),
            _ => None,
        })
    }

    pub fn distributions(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            LockLine::Entry { distribution, .. } => Some(distribution.as_str()),
            _ => None,
        })
    }

    /// Replace (or insert) the constraint for `distribution` with an exact
    /// match on `version`, as `local` does (spec.md §6: "Any previously
    /// constraint used in this file for the distribution will be removed,
    /// and an exact match ('=') will be used"). All comment lines and their
    /// relative order are preserved.
    pub fn set_exact(&mut self, distribution: &str, version: &Version) {
        let constraint = Constraint::parse(&format!("={version}")).expect("= is always valid");
        let mut replaced = false;
        for line in &mut self.lines {
            if let LockLine::Entry { distribution: d, constraint: c } = line {
                if d == distribution {
                    *c = constraint.clone();
                    replaced = true;
                    break;
                }
            }
        }
        if !replaced {
            self.lines.push(LockLine::Entry {
                distribution: distribution.to_string(),
                constraint,
            });
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                LockLine::Comment(c) => {
                    out.push_str(c);
                    out.push('\n');
                }
                LockLine::Blank => out.push('\n'),
                LockLine::Entry { distribution, constraint } => {
                    out.push_str(distribution);
                    out.push_str(&constraint.to_string());
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn write_to(&self, path: &Utf8Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("unable to write lock file {path}"))?;
        Ok(())
    }
}

/// Solve a single distribution's constraint against an ordered (descending)
/// candidate list (spec.md §4.8). `BINENV_<NAME>_VERSION`, if set and
/// parseable, overrides `constraint` with an exact match before solving.
pub fn solve<'a>(
    distribution: &str,
    constraint: &Constraint,
    candidates: impl IntoIterator<Item = &'a Version>,
) -> Result<Version, BinenvError> {
    let effective = env_override_constraint(distribution).unwrap_or_else(|| constraint.clone());
    candidates
        .into_iter()
        .find(|v| effective.matches(v))
        .cloned()
        .ok_or_else(|| BinenvError::Unsatisfiable {
            distribution: distribution.to_string(),
            constraint: effective.to_string(),
        })
}

/// Build an exact-match constraint from `BINENV_<NAME>_VERSION`, if set and
/// parseable as a version.
pub fn env_override_constraint(distribution: &str) -> Option<Constraint> {
    let raw = std::env::var(env_override_var_name(distribution)).ok()?;
    Constraint::parse(&format!("={}", raw.trim())).ok()
}

impl fmt::Display for LockFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parses_comments_and_entries() {
        let lf = LockFile::parse("# pinned tools\nkubectl~>1.27\nterraform=1.5.7\n").unwrap();
        assert_eq!(lf.distributions().collect::<Vec<_>>(), vec!["kubectl", "terraform"]);
    }

    #[test]
    fn solve_picks_highest_matching_descending_candidate() {
        let candidates = vec![v("1.28.3"), v("1.27.10"), v("1.27.1")];
        let constraint = Constraint::parse("~>1.27").unwrap();
        let result = solve("kubectl", &constraint, &candidates).unwrap();
        assert_eq!(result.canonical(), "1.27.10");
    }

    #[test]
    fn solve_is_unsatisfiable_when_nothing_matches() {
        let candidates = vec![v("1.5.7"), v("1.4.0")];
        let constraint = Constraint::parse(">=2.0.0").unwrap();
        let err = solve("terraform", &constraint, &candidates).unwrap_err();
        assert!(matches!(err, BinenvError::Unsatisfiable { .. }));
    }

    #[test]
    fn freeze_round_trip_preserves_triples() {
        let mut lf = LockFile::parse("# a comment\n").unwrap();
        lf.set_exact("kubectl", &v("1.27.10"));
        lf.set_exact("terraform", &v("1.5.7"));
        let rendered = lf.render();

        let reparsed = LockFile::parse(&rendered).unwrap();
        assert_eq!(
            reparsed.entry_for("kubectl").unwrap().to_string(),
            "=1.27.10"
        );
        assert_eq!(
            reparsed.entry_for("terraform").unwrap().to_string(),
            "=1.5.7"
        );
        assert!(rendered.starts_with("# a comment\n"));
    }

    #[test]
    fn set_exact_replaces_existing_constraint_in_place() {
        let mut lf = LockFile::parse("kubectl~>1.28\nterraform>=1.0.0\n").unwrap();
        lf.set_exact("kubectl", &v("1.27.1"));
        assert_eq!(lf.lines.len(), 2);
        assert_eq!(lf.entry_for("kubectl").unwrap().to_string(), "=1.27.1");
    }
}
