//! Platform presets for test scripts.

use std::path::PathBuf;

use revhunt_core::{Result, RevhuntError};
use serde::{Deserialize, Serialize};

use crate::runner::ScriptConfig;

/// Environment variable naming the repository checkout used by CI scripts.
pub const CHECKOUT_DIR_ENV: &str = "RAYCI_CHECKOUT_DIR";

/// Execution environments with a known test script.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// ./ci/ray_ci/macos_ci_test.sh <test>
    MacOs,
}

impl Platform {
    /// Get the platform name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
        }
    }

    /// Script path, relative to the checkout directory.
    pub fn script(&self) -> &'static str {
        match self {
            Platform::MacOs => "./ci/ray_ci/macos_ci_test.sh",
        }
    }

    /// Script configuration running in `checkout_dir`, without the test argument.
    pub fn script_config(&self, checkout_dir: impl Into<PathBuf>) -> ScriptConfig {
        ScriptConfig::custom(
            format!("{}_ci_test", self.name()),
            vec![self.script().to_string()],
        )
        .in_dir(checkout_dir)
    }
}

impl std::str::FromStr for Platform {
    type Err = RevhuntError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "macos" | "darwin" => Ok(Platform::MacOs),
            other => Err(RevhuntError::Validator(format!("unknown platform: {other}"))),
        }
    }
}

/// Checkout directory from `RAYCI_CHECKOUT_DIR`.
pub fn checkout_dir_from_env() -> Result<PathBuf> {
    std::env::var_os(CHECKOUT_DIR_ENV)
        .map(PathBuf::from)
        .ok_or_else(|| RevhuntError::Validator(format!("{CHECKOUT_DIR_ENV} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::MacOs.name(), "macos");
        assert_eq!(Platform::MacOs.script(), "./ci/ray_ci/macos_ci_test.sh");
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::MacOs);
        assert_eq!("Darwin".parse::<Platform>().unwrap(), Platform::MacOs);
        assert!("windows".parse::<Platform>().is_err());
    }

    #[test]
    fn test_script_config_runs_in_checkout_dir() {
        let config = Platform::MacOs.script_config("/tmp/checkout");
        assert_eq!(config.name, "macos_ci_test");
        assert_eq!(config.command, vec!["./ci/ray_ci/macos_ci_test.sh".to_string()]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/tmp/checkout")));
        assert_eq!(config.timeout_secs, 0);
    }
}
