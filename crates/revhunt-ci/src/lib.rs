//! revhunt CI - script-backed validators
//!
//! Provides the validator variants used by bisection:
//! - Runs platform test scripts as child processes
//! - Checks out each revision before running the script
//! - Maps exit code 0 to "good" and anything else to "bad"

pub mod platform;
pub mod runner;
pub mod validator;

// Re-export key types
pub use platform::{checkout_dir_from_env, Platform, CHECKOUT_DIR_ENV};
pub use runner::{ScriptConfig, ScriptResult, ScriptRunner};
pub use validator::{MacOsValidator, ScriptValidator};
