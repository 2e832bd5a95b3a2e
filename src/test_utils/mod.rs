//! Fixtures shared by the unit tests, the integration tests and the
//! benchmarks.

use crate::{api::Cpabe, config::SchemeConfig, Error, MasterSecret, PublicParams};

pub mod non_regression;

/// Policies of increasing size, from a single conjunction to a depth 4
/// tree with nested thresholds.
pub const POLICIES: [&str; 4] = [
    "dept_FIN and level_ge_3",
    "(dept = FIN or dept = MKG) and level >= 3",
    "2 of (dept = HR, role = manager, level >= 5) or admin",
    "(dept = FIN and 2 of (role = auditor, level >= 3, site_paris)) or \
     (dept = MKG and 1 of (role = manager, 2 of (a, b, c))) or admin",
];

/// Attributes satisfying every policy of [`POLICIES`].
pub const FULL_ATTRIBUTES: [&str; 5] = [
    "dept_FIN",
    "level_ge_3",
    "role_auditor",
    "site_paris",
    "admin",
];

/// Sets up a new authority with the default configuration.
pub fn authority(cpabe: &Cpabe) -> Result<(PublicParams, MasterSecret), Error> {
    cpabe.setup(SchemeConfig::default())
}

/// Returns the `n` first attributes of a generated universe.
#[must_use]
pub fn attributes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("attr{i}")).collect()
}

/// `n of (attr0, ..., attr{n-1})`, or the single attribute for `n = 1`.
#[must_use]
pub fn conjunction(n: usize) -> String {
    match n {
        0 => String::new(),
        1 => "attr0".to_string(),
        _ => format!("{n} of ({})", attributes(n).join(", ")),
    }
}

/// `1 of (attr0, ..., attr{n-1})`, or the single attribute for `n = 1`.
#[must_use]
pub fn disjunction(n: usize) -> String {
    match n {
        0 => String::new(),
        1 => "attr0".to_string(),
        _ => format!("1 of ({})", attributes(n).join(", ")),
    }
}
