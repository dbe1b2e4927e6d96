//! Constraint expressions: `<operator><version>`, optionally comma-separated
//! (conjunction), as found in `.binenv.lock` lines (spec.md §3/§4.8).

use std::fmt;

use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `~>`, a caret-equivalent range: matches any version with the same
    /// major.minor that is `>=` the literal, whether or not the literal
    /// itself gave a patch component.
    Tilde,
}

impl Operator {
    /// The operator characters recognized by the lock-file grammar,
    /// longest-match-first so `~>` isn't mistaken for an unknown `~`.
    const TOKENS: &'static [(&'static str, Operator)] = &[
        ("~>", Operator::Tilde),
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("!=", Operator::Ne),
        ("=", Operator::Eq),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Tilde => "~>",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct Term {
    pub operator: Operator,
    pub version: Version,
    /// `true` when a `~>` literal omitted its patch component (e.g.
    /// `~>1.27`), so rendering can reproduce the original form instead of
    /// the zero-padded parse (`1.27.0`). Unused for every other operator.
    pub tilde_omitted_patch: bool,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tilde_omitted_patch {
            write!(f, "{}{}.{}", self.operator, self.version.major(), self.version.minor())
        } else {
            write!(f, "{}{}", self.operator, self.version)
        }
    }
}

/// A comma-separated conjunction of terms, e.g. `>=1.0.0,<2.0.0`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub terms: Vec<Term>,
}

impl Constraint {
    /// Parse a constraint expression, i.e. everything after the
    /// distribution name in a lock-file line.
    pub fn parse(expr: &str) -> anyhow::Result<Self> {
        let terms = expr
            .split(',')
            .map(|part| parse_term(part.trim()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if terms.is_empty() {
            anyhow::bail!("empty constraint expression");
        }
        Ok(Self { terms })
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        self.terms.iter().all(|term| term_matches(term, candidate))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.terms.iter().map(Term::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}

fn parse_term(part: &str) -> anyhow::Result<Term> {
    for (token, operator) in Operator::TOKENS {
        if let Some(rest) = part.strip_prefix(token) {
            let rest = rest.trim();
            if *operator == Operator::Tilde {
                let dots = rest.matches('.').count();
                let (version, tilde_omitted_patch) = match dots {
                    2 => (Version::parse(rest)?, false),
                    1 => (Version::parse(&format!("{rest}.0"))?, true),
                    _ => anyhow::bail!("tilde constraint '{part}' needs at least major.minor"),
                };
                return Ok(Term {
                    operator: *operator,
                    version,
                    tilde_omitted_patch,
                });
            }
            let version = Version::parse(rest)?;
            return Ok(Term {
                operator: *operator,
                version,
                tilde_omitted_patch: false,
            });
        }
    }
    anyhow::bail!("constraint '{part}' has no recognized operator")
}

fn term_matches(term: &Term, candidate: &Version) -> bool {
    match term.operator {
        Operator::Eq => candidate == &term.version,
        Operator::Ne => candidate != &term.version,
        Operator::Lt => candidate < &term.version,
        Operator::Le => candidate <= &term.version,
        Operator::Gt => candidate > &term.version,
        Operator::Ge => candidate >= &term.version,
        Operator::Tilde => tilde_matches(candidate, &term.version),
    }
}

/// `~>MAJOR.MINOR[.PATCH]` matches any version `>=` the literal within the
/// same major.minor (spec.md §8 scenario 2: `kubectl~>1.27` against
/// `{1.28.3,1.27.10,1.27.1}` selects `1.27.10`, not `1.28.3`).
fn tilde_matches(candidate: &Version, literal: &Version) -> bool {
    if candidate < literal {
        return false;
    }
    candidate.major() == literal.major() && candidate.minor() == literal.minor()
}

/// Find the start of the operator in a lock-file record: the distribution
/// name ends at the first character in `=!<>~` (spec.md §3).
pub fn split_distribution_and_expr(record: &str) -> Option<(&str, &str)> {
    let idx = record.find(['=', '!', '<', '>', '~'])?;
    Some((&record[..idx], &record[idx..]))
}

/// Name of the per-distribution override variable: `BINENV_<NAME>_VERSION`,
/// `<NAME>` the distribution uppercased with non-`[A-Z0-9_]` bytes replaced
/// by `_` (spec.md §4.8).
pub fn env_override_var_name(distribution: &str) -> String {
    let name: String = distribution
        .chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            if upper.is_ascii_alphanumeric() || upper == '_' {
                upper
            } else {
                '_'
            }
        })
        .collect();
    format!("BINENV_{name}_VERSION")
}
