//! Validators that check out a revision and run a test script.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use revhunt_core::{Checkout, GitCheckout, Result, Revision, Validator};
use tracing::info;

use crate::platform::{checkout_dir_from_env, Platform};
use crate::runner::{ScriptConfig, ScriptRunner};

/// Checks out the revision, then runs `script <test>`; good means exit code 0.
pub struct ScriptValidator {
    test: String,
    checkout: Arc<dyn Checkout>,
    script: ScriptConfig,
}

impl ScriptValidator {
    pub fn new(test: impl Into<String>, checkout: Arc<dyn Checkout>, script: ScriptConfig) -> Self {
        Self {
            test: test.into(),
            checkout,
            script,
        }
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn script(&self) -> &ScriptConfig {
        &self.script
    }
}

#[async_trait]
impl Validator for ScriptValidator {
    async fn validate(&self, revision: &Revision) -> Result<bool> {
        self.checkout.checkout(revision).await?;

        let result = ScriptRunner::execute(&self.script.with_arg(self.test.as_str())).await?;
        info!(
            revision = %revision,
            test = %self.test,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "validated revision"
        );
        Ok(result.passed())
    }
}

/// macOS preset: git checkout in the CI checkout dir, then
/// `./ci/ray_ci/macos_ci_test.sh <test>` from that directory.
pub struct MacOsValidator {
    inner: ScriptValidator,
}

impl MacOsValidator {
    pub fn new(test: impl Into<String>, checkout_dir: impl Into<PathBuf>) -> Self {
        let checkout_dir = checkout_dir.into();
        let inner = ScriptValidator::new(
            test,
            Arc::new(GitCheckout::new(checkout_dir.clone())),
            Platform::MacOs.script_config(checkout_dir),
        );
        Self { inner }
    }

    /// Use the checkout directory named by `RAYCI_CHECKOUT_DIR`.
    pub fn from_env(test: impl Into<String>) -> Result<Self> {
        Ok(Self::new(test, checkout_dir_from_env()?))
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.inner.script = self.inner.script.with_timeout_secs(timeout_secs);
        self
    }

    pub fn script(&self) -> &ScriptConfig {
        self.inner.script()
    }
}

#[async_trait]
impl Validator for MacOsValidator {
    async fn validate(&self, revision: &Revision) -> Result<bool> {
        self.inner.validate(revision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revhunt_core::fakes::RecordingCheckout;
    use revhunt_core::RevhuntError;

    fn sh(script: &str) -> ScriptConfig {
        ScriptConfig::custom(
            "sh_test",
            vec!["sh".to_string(), "-c".to_string(), script.to_string(), "sh".to_string()],
        )
    }

    #[tokio::test]
    async fn test_checks_out_before_running() {
        let checkout = Arc::new(RecordingCheckout::new());
        let validator = ScriptValidator::new("unit", checkout.clone(), sh("exit 0"));

        assert!(validator.validate(&Revision::new("abc")).await.unwrap());
        assert_eq!(checkout.checked_out(), vec![Revision::new("abc")]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_bad() {
        let checkout = Arc::new(RecordingCheckout::new());
        let validator = ScriptValidator::new("unit", checkout, sh("exit 3"));

        assert!(!validator.validate(&Revision::new("abc")).await.unwrap());
    }

    #[tokio::test]
    async fn test_passes_test_name_as_last_argument() {
        let checkout = Arc::new(RecordingCheckout::new());
        let validator =
            ScriptValidator::new("test_expected", checkout, sh("test \"$1\" = test_expected"));

        assert!(validator.validate(&Revision::new("abc")).await.unwrap());
    }

    #[tokio::test]
    async fn test_checkout_failure_skips_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let checkout = Arc::new(RecordingCheckout::failing_on("abc"));
        let validator = ScriptValidator::new(
            "unit",
            checkout,
            sh(&format!("touch {}", marker.display())),
        );

        let err = validator.validate(&Revision::new("abc")).await.unwrap_err();
        assert!(matches!(err, RevhuntError::Checkout { .. }));
        assert!(!marker.exists());
    }

    #[test]
    fn test_macos_preset_uses_platform_script() {
        let validator = MacOsValidator::new("//python/ray/tests:test_basic", "/tmp/ray")
            .with_timeout_secs(600);
        let script = validator.script();
        assert_eq!(script.command, vec!["./ci/ray_ci/macos_ci_test.sh".to_string()]);
        assert_eq!(script.working_dir, Some(PathBuf::from("/tmp/ray")));
        assert_eq!(script.timeout_secs, 600);
    }
}
