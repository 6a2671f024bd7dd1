//! Global run configuration.
//!
//! Defaults come from a named profile, a YAML file or environment
//! variables, and can be replaced process-wide with [`configure_global`].

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Environment variable names.
pub mod vars {
    /// Profile name: `quick`, `standard` or `ci`.
    pub const PROPIT_PROFILE: &str = "PROPIT_PROFILE";
    /// Path to a YAML configuration file.
    pub const PROPIT_CONFIG: &str = "PROPIT_CONFIG";
    /// Number of random samples per property.
    pub const PROPIT_NUM_RUNS: &str = "PROPIT_NUM_RUNS";
    /// Fixed seed for every run.
    pub const PROPIT_SEED: &str = "PROPIT_SEED";
    /// Upper bound on shrink attempts.
    pub const PROPIT_MAX_SHRINKS: &str = "PROPIT_MAX_SHRINKS";
}

/// Defaults applied to every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalParameters {
    /// Random samples per property.
    pub num_runs: u32,
    /// Fixed seed; random per run when unset.
    pub seed: Option<u64>,
    /// Upper bound on shrink attempts.
    pub max_shrinks: u32,
    /// Skip shrinking.
    pub end_on_failure: bool,
    /// Stop sampling after this many milliseconds.
    pub interrupt_after_time_limit_ms: Option<u64>,
    /// Treat interrupted runs as failures.
    pub mark_interrupt_as_failure: bool,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self::standard()
    }
}

impl GlobalParameters {
    /// Standard configuration.
    pub fn standard() -> Self {
        Self {
            num_runs: 100,
            seed: None,
            max_shrinks: 10_000,
            end_on_failure: false,
            interrupt_after_time_limit_ms: None,
            mark_interrupt_as_failure: false,
        }
    }

    /// Quick configuration for development (fewer runs).
    pub fn quick() -> Self {
        Self {
            num_runs: 32,
            max_shrinks: 1_000,
            ..Self::standard()
        }
    }

    /// Thorough configuration for CI (more runs).
    pub fn ci() -> Self {
        Self {
            num_runs: 1_024,
            max_shrinks: 50_000,
            ..Self::standard()
        }
    }

    /// Look up a profile by name.
    pub fn profile(name: &str) -> EngineResult<Self> {
        match name.to_lowercase().as_str() {
            "quick" => Ok(Self::quick()),
            "standard" => Ok(Self::standard()),
            "ci" => Ok(Self::ci()),
            other => Err(EngineError::UnknownProfile(other.to_string())),
        }
    }

    /// Load from a YAML file; missing fields take standard values.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Build from the environment.
    ///
    /// The base is the file named by `PROPIT_CONFIG`, else the profile named
    /// by `PROPIT_PROFILE`, else `standard`. `PROPIT_NUM_RUNS`, `PROPIT_SEED`
    /// and `PROPIT_MAX_SHRINKS` override individual fields.
    pub fn from_env() -> EngineResult<Self> {
        let mut params = if let Ok(path) = env::var(vars::PROPIT_CONFIG) {
            Self::load(Path::new(&path))?
        } else if let Ok(profile) = env::var(vars::PROPIT_PROFILE) {
            Self::profile(&profile)?
        } else {
            Self::standard()
        };

        if let Some(num_runs) = parse_var(vars::PROPIT_NUM_RUNS)? {
            params.num_runs = num_runs;
        }
        if let Some(seed) = parse_var(vars::PROPIT_SEED)? {
            params.seed = Some(seed);
        }
        if let Some(max_shrinks) = parse_var(vars::PROPIT_MAX_SHRINKS)? {
            params.max_shrinks = max_shrinks;
        }

        Ok(params)
    }
}

fn parse_var<T: FromStr>(var: &str) -> EngineResult<Option<T>> {
    match env::var(var) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| EngineError::InvalidEnv {
            var: var.to_string(),
            message: format!("expected an integer, got {value:?}"),
        }),
        Err(_) => Ok(None),
    }
}

static GLOBAL: Lazy<RwLock<Option<GlobalParameters>>> = Lazy::new(|| RwLock::new(None));

/// Replace the process-wide defaults.
pub fn configure_global(params: GlobalParameters) {
    *GLOBAL.write() = Some(params);
}

/// Read the process-wide defaults, loading them from the environment on
/// first use. An unusable environment falls back to the standard profile.
pub fn read_configure_global() -> GlobalParameters {
    if let Some(params) = GLOBAL.read().as_ref() {
        return params.clone();
    }

    let loaded = GlobalParameters::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring invalid property configuration");
        GlobalParameters::standard()
    });
    GLOBAL.write().get_or_insert(loaded).clone()
}

/// Forget any configured defaults; the next read goes back to the environment.
pub fn reset_configure_global() {
    *GLOBAL.write() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test_case("quick", 32 ; "quick profile")]
    #[test_case("standard", 100 ; "standard profile")]
    #[test_case("CI", 1_024 ; "ci profile is case insensitive")]
    fn test_profiles(name: &str, num_runs: u32) {
        assert_eq!(GlobalParameters::profile(name).unwrap().num_runs, num_runs);
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        assert!(matches!(
            GlobalParameters::profile("exhaustive"),
            Err(EngineError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_runs: 7\nseed: 1234").unwrap();

        let params = GlobalParameters::load(file.path()).unwrap();
        assert_eq!(params.num_runs, 7);
        assert_eq!(params.seed, Some(1234));
        assert_eq!(params.max_shrinks, GlobalParameters::standard().max_shrinks);
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_runs: [not a number").unwrap();
        assert!(matches!(
            GlobalParameters::load(file.path()),
            Err(EngineError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(matches!(
            GlobalParameters::load(&missing),
            Err(EngineError::Io(_))
        ));
    }
}
