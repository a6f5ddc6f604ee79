//! revhunt - CI regression hunting CLI
//!
//! ## Commands
//!
//! - `bisect`: find the revision that broke a test between a passing and a
//!   failing revision
//! - `gap-fill`: schedule builds for revisions skipped between the latest
//!   passing and latest failing builds of a pipeline

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use buildkite_ledger::BuildkiteClient;
use revhunt_ci::{MacOsValidator, Platform, ScriptConfig, ScriptValidator, CHECKOUT_DIR_ENV};
use revhunt_core::{
    BisectOutcome, Bisector, GapFillConfig, GapFillingScheduler, GitCheckout, GitRevisionRange,
    Revision, ScheduledGapBuild, Validator, DEFAULT_BRANCH, DEFAULT_LOOKBACK_DAYS,
    MAX_LOOKBACK_DAYS,
};

#[derive(Parser)]
#[command(name = "revhunt")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hunt down CI regressions by bisection and gap-filling builds", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and a JSON result on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the first revision that fails a test
    Bisect {
        /// Test to run against each candidate revision
        #[arg(long)]
        test: String,

        /// Revision known to pass the test
        #[arg(long)]
        passing: String,

        /// Revision known to fail the test
        #[arg(long)]
        failing: String,

        /// Repository used to enumerate revisions
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Platform preset for the test script
        #[arg(long, default_value = "macos")]
        platform: Platform,

        /// Custom test command; the test name is appended as the last argument
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        script: Option<Vec<String>>,

        /// Checkout the script runs in (defaults to --repo)
        #[arg(long, env = CHECKOUT_DIR_ENV)]
        checkout_dir: Option<PathBuf>,

        /// Kill the test script after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Schedule builds for revisions between the latest passing and failing builds
    GapFill {
        /// Buildkite organization slug
        #[arg(long)]
        organization: String,

        /// Buildkite pipeline slug
        #[arg(long)]
        pipeline: String,

        /// Branch whose builds are inspected
        #[arg(long, default_value = DEFAULT_BRANCH)]
        branch: String,

        /// Lookback window in days
        #[arg(
            long,
            default_value_t = DEFAULT_LOOKBACK_DAYS,
            value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_DAYS)
        )]
        days: i64,

        /// Report the gap without creating builds
        #[arg(long)]
        dry_run: bool,

        /// Repository used to enumerate revisions
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

/// Bisection result document.
#[derive(Debug, Serialize)]
struct BisectReport {
    test: String,
    passing: Revision,
    failing: Revision,
    #[serde(flatten)]
    outcome: BisectOutcome,
}

/// Gap-fill result document.
#[derive(Debug, Serialize)]
struct GapFillReport {
    organization: String,
    pipeline: String,
    branch: String,
    dry_run: bool,
    scheduled: Vec<ScheduledGapBuild>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    revhunt_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Bisect {
            test,
            passing,
            failing,
            repo,
            platform,
            script,
            checkout_dir,
            timeout_secs,
        } => {
            let passing = Revision::parse(&passing).context("Invalid --passing revision")?;
            let failing = Revision::parse(&failing).context("Invalid --failing revision")?;
            let checkout_dir = checkout_dir.unwrap_or_else(|| repo.clone());
            let validator =
                build_validator(&test, platform, script, &checkout_dir, timeout_secs)?;
            let report = cmd_bisect(&test, passing, failing, &repo, validator).await?;
            print_bisect(&report, cli.json)
        }
        Commands::GapFill {
            organization,
            pipeline,
            branch,
            days,
            dry_run,
            repo,
        } => {
            let config = GapFillConfig::new(organization, pipeline)
                .with_branch(branch)
                .with_lookback_days(days);
            let client =
                BuildkiteClient::from_env().context("Failed to configure Buildkite client")?;
            let report = cmd_gap_fill(config, Arc::new(client), &repo, dry_run).await?;
            print_gap_fill(&report, cli.json)
        }
    }
}

/// Pick the validator: a custom script when given, otherwise the platform preset.
fn build_validator(
    test: &str,
    platform: Platform,
    script: Option<Vec<String>>,
    checkout_dir: &Path,
    timeout_secs: Option<u64>,
) -> Result<Arc<dyn Validator>> {
    match script {
        Some(command) => {
            if command.is_empty() {
                anyhow::bail!("--script needs at least one argument");
            }
            let mut config = ScriptConfig::custom("custom", command).in_dir(checkout_dir);
            if let Some(secs) = timeout_secs {
                config = config.with_timeout_secs(secs);
            }
            Ok(Arc::new(ScriptValidator::new(
                test,
                Arc::new(GitCheckout::new(checkout_dir)),
                config,
            )))
        }
        None => match platform {
            Platform::MacOs => {
                let mut validator = MacOsValidator::new(test, checkout_dir);
                if let Some(secs) = timeout_secs {
                    validator = validator.with_timeout_secs(secs);
                }
                Ok(Arc::new(validator))
            }
        },
    }
}

/// Bisect `passing..failing` in `repo` with `validator`.
async fn cmd_bisect(
    test: &str,
    passing: Revision,
    failing: Revision,
    repo: &Path,
    validator: Arc<dyn Validator>,
) -> Result<BisectReport> {
    let head = revhunt_core::head_revision(repo)
        .await
        .with_context(|| format!("Not a git repository: {:?}", repo))?;
    info!(head = %head, repo = ?repo, "starting bisection");

    let bisector = Bisector::new(
        test,
        passing.clone(),
        failing.clone(),
        Arc::new(GitRevisionRange::new(repo)),
        validator,
    );
    let outcome = bisector
        .run_detailed()
        .await
        .with_context(|| format!("Bisection of {} failed", test))?;

    Ok(BisectReport {
        test: test.to_string(),
        passing,
        failing,
        outcome,
    })
}

/// Fill the build gap of one pipeline, using `repo` for revision history.
async fn cmd_gap_fill(
    config: GapFillConfig,
    ledger: Arc<dyn revhunt_core::BuildLedger>,
    repo: &Path,
    dry_run: bool,
) -> Result<GapFillReport> {
    revhunt_core::head_revision(repo)
        .await
        .with_context(|| format!("Not a git repository: {:?}", repo))?;

    let report = GapFillReport {
        organization: config.organization.clone(),
        pipeline: config.pipeline.clone(),
        branch: config.branch.clone(),
        dry_run,
        scheduled: Vec::new(),
    };
    let scheduler = GapFillingScheduler::new(config, ledger, Arc::new(GitRevisionRange::new(repo)));
    let scheduled = scheduler
        .run(dry_run)
        .await
        .context("Gap filling failed")?;

    Ok(GapFillReport { scheduled, ..report })
}

fn print_bisect(report: &BisectReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match &report.outcome.blamed {
        Some(revision) => {
            println!("{}", revision);
            println!(
                "  {} candidates, {} test runs",
                report.outcome.range_len, report.outcome.validations
            );
        }
        None => println!("no blame found"),
    }
    Ok(())
}

fn print_gap_fill(report: &GapFillReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.scheduled.is_empty() {
        println!(
            "No gap found for {}/{} on {}",
            report.organization, report.pipeline, report.branch
        );
        return Ok(());
    }
    for build in &report.scheduled {
        match build.build_number {
            Some(number) => println!("{} {}", build.revision, number),
            None => println!("{} dry-run", build.revision),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use revhunt_core::fakes::MemoryBuildLedger;
    use revhunt_core::{BuildRecord, BuildState, FnValidator};
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    /// Repository with `n` commits, oldest first.
    fn repo_with_commits(n: usize) -> (tempfile::TempDir, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "--quiet"]);
        git(dir.path(), &["config", "user.email", "ci@example.com"]);
        git(dir.path(), &["config", "user.name", "CI"]);
        let mut shas = Vec::new();
        for i in 0..n {
            std::fs::write(dir.path().join("file.txt"), i.to_string()).unwrap();
            git(dir.path(), &["add", "file.txt"]);
            git(dir.path(), &["commit", "--quiet", "-m", &format!("commit {i}")]);
            shas.push(git(dir.path(), &["rev-parse", "HEAD"]));
        }
        (dir, shas)
    }

    #[test]
    fn test_parse_bisect_args() {
        let cli = Cli::try_parse_from([
            "revhunt",
            "bisect",
            "--test",
            "//python/ray/tests:test_basic",
            "--passing",
            "aaa",
            "--failing",
            "bbb",
            "--timeout-secs",
            "600",
        ])
        .unwrap();

        match cli.command {
            Commands::Bisect {
                test,
                platform,
                repo,
                script,
                timeout_secs,
                ..
            } => {
                assert_eq!(test, "//python/ray/tests:test_basic");
                assert_eq!(platform, Platform::MacOs);
                assert_eq!(repo, PathBuf::from("."));
                assert!(script.is_none());
                assert_eq!(timeout_secs, Some(600));
            }
            _ => panic!("expected bisect"),
        }
    }

    #[test]
    fn test_parse_custom_script() {
        let cli = Cli::try_parse_from([
            "revhunt", "bisect", "--test", "t", "--passing", "a", "--failing", "b", "--script",
            "sh", "-c", "exit 0",
        ])
        .unwrap();

        match cli.command {
            Commands::Bisect { script, .. } => {
                assert_eq!(
                    script,
                    Some(vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string()])
                );
            }
            _ => panic!("expected bisect"),
        }
    }

    #[test]
    fn test_parse_unknown_platform_rejected() {
        let result = Cli::try_parse_from([
            "revhunt", "bisect", "--test", "t", "--passing", "a", "--failing", "b", "--platform",
            "plan9",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_gap_fill_defaults() {
        let cli = Cli::try_parse_from([
            "revhunt",
            "--json",
            "gap-fill",
            "--organization",
            "ray-project",
            "--pipeline",
            "postmerge",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::GapFill {
                branch,
                days,
                dry_run,
                ..
            } => {
                assert_eq!(branch, "master");
                assert_eq!(days, 1);
                assert!(!dry_run);
            }
            _ => panic!("expected gap-fill"),
        }
    }

    #[test]
    fn test_gap_fill_days_out_of_range_rejected() {
        for days in ["--days=0", "--days=-3", "--days=3651", "--days=200000000000"] {
            let result = Cli::try_parse_from([
                "revhunt",
                "gap-fill",
                "--organization",
                "ray-project",
                "--pipeline",
                "postmerge",
                days,
            ]);
            assert!(result.is_err(), "{days} should be rejected");
        }
    }

    #[test]
    fn test_gap_fill_days_upper_bound_accepted() {
        let cli = Cli::try_parse_from([
            "revhunt",
            "gap-fill",
            "--organization",
            "ray-project",
            "--pipeline",
            "postmerge",
            "--days=3650",
        ])
        .unwrap();
        match cli.command {
            Commands::GapFill { days, .. } => assert_eq!(days, MAX_LOOKBACK_DAYS),
            _ => panic!("expected gap-fill"),
        }
    }

    #[test]
    fn test_gap_fill_requires_pipeline() {
        let result = Cli::try_parse_from(["revhunt", "gap-fill", "--organization", "ray-project"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_script_rejected() {
        let result = build_validator("t", Platform::MacOs, Some(vec![]), Path::new("."), None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cmd_bisect_rejects_non_repo() {
        let dir = tempfile::tempdir().unwrap();
        let validator: Arc<dyn Validator> = Arc::new(FnValidator::new(|_| Ok(true)));
        let result = cmd_bisect(
            "t",
            Revision::new("a"),
            Revision::new("b"),
            dir.path(),
            validator,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cmd_bisect_reports_blamed_revision() {
        let (dir, shas) = repo_with_commits(6);
        let breaking = shas[3].clone();
        let bad: Vec<String> = shas[3..].to_vec();
        let validator: Arc<dyn Validator> = Arc::new(FnValidator::new(move |rev: &Revision| {
            Ok(!bad.iter().any(|s| s == rev.as_str()))
        }));

        let report = cmd_bisect(
            "t",
            Revision::new(shas[0].as_str()),
            Revision::new(shas[5].as_str()),
            dir.path(),
            validator,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome.blamed, Some(Revision::new(breaking)));
        assert_eq!(report.outcome.range_len, 5);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["test"], "t");
        assert_eq!(json["range_len"], 5);
    }

    #[tokio::test]
    async fn test_cmd_gap_fill_dry_run() {
        let (dir, shas) = repo_with_commits(5);
        let ledger = Arc::new(MemoryBuildLedger::with_builds(vec![
            BuildRecord::new(2, BuildState::Failed, shas[4].as_str()),
            BuildRecord::new(1, BuildState::Passed, shas[1].as_str()),
        ]));

        let report = cmd_gap_fill(
            GapFillConfig::new("ray-project", "postmerge"),
            ledger.clone(),
            dir.path(),
            true,
        )
        .await
        .unwrap();

        let revisions: Vec<&str> = report.scheduled.iter().map(|s| s.revision.as_str()).collect();
        assert_eq!(revisions, vec![shas[2].as_str(), shas[3].as_str()]);
        assert!(report.scheduled.iter().all(|s| s.build_number.is_none()));
        assert!(ledger.created().is_empty());
        assert!(report.dry_run);
    }
}
