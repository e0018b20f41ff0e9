//! Property-test run profile parsing for CI and local overrides.
//!
//! Every property suite in the workspace reads the same two variables, so a
//! CI job can raise case counts or enable forking without code changes.

use std::env;

/// Environment variable controlling proptest case counts.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const GCNLINK_PBT_FORK_ENV_KEY: &str = "GCNLINK_PBT_FORK";

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Loads a profile from the process environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcnlink_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self::from_lookup(default_cases, default_fork, |key| env::var(key).ok())
    }

    /// Loads a profile from an arbitrary key lookup.
    ///
    /// Unparseable overrides are logged and replaced by the defaults.
    #[must_use]
    pub fn from_lookup(
        default_cases: u32,
        default_fork: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            cases: Override::new(PROGTEST_CASES_ENV_KEY, &lookup).resolve(default_cases, parse_cases),
            fork: Override::new(GCNLINK_PBT_FORK_ENV_KEY, &lookup).resolve(default_fork, parse_bool),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub const fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether to run proptest cases in forked subprocesses.
    #[must_use]
    pub const fn fork(&self) -> bool {
        self.fork
    }
}

struct Override {
    key: &'static str,
    raw: Option<String>,
}

impl Override {
    fn new(key: &'static str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            key,
            raw: lookup(key),
        }
    }

    fn resolve<T>(self, default: T, parse: fn(&str) -> Result<T, String>) -> T {
        let Some(raw) = self.raw else {
            return default;
        };
        parse(&raw).unwrap_or_else(|reason| {
            tracing::warn!(
                env = self.key,
                raw = %raw,
                reason = %reason,
                "invalid property-test profile override; using default",
            );
            default
        })
    }
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("cases must be > 0".to_owned()),
        Ok(cases) => Ok(cases),
        Err(error) => Err(format!("parse error: {error}")),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected one of: true/false/1/0/yes/no/on/off".to_owned()),
    }
}
