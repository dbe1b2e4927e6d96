#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod catalog;
pub mod checksum;
pub mod command;
pub mod constraint;
pub mod dispatch;
pub mod error;
pub mod layout;
pub mod lockfile;
pub mod opt;
pub mod orchestrator;
pub mod resolver;
pub mod version;

/// Canonical name this binary registers itself under. Any other invoked
/// name (via a `<linkdir>/<distribution>` symlink) is shim dispatch
/// (spec.md §4.11).
pub const SELF_NAME: &str = "binenv";
