// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use todd::{BuildConfig, ChainRequest, Error, InstallRequest, ProgressLedger, RunSummary};
use tracing::info;

#[derive(Parser)]
#[command(name = "todd")]
#[command(author, version, about = "Resumable from-source Linux build system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cross toolchain chain into a target root
    Toolchain {
        /// Path to the target system
        path: PathBuf,
        /// Chain catalog (package;src_packages;build_script records)
        #[arg(short, long, default_value = "builds.csv")]
        catalog: PathBuf,
        /// Directory holding the chain's build scripts
        #[arg(short, long, default_value = "build_scripts")]
        scripts: PathBuf,
        /// Ledger file (default: <path>/builds/builds.lock)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Don't print messages from underlying build processes
        #[arg(short, long)]
        quiet: bool,
        /// Measure build time
        #[arg(short, long)]
        time: bool,
        /// Number of concurrent jobs (default: number of CPUs)
        #[arg(short, long, env = "TODD_JOBS")]
        jobs: Option<usize>,
    },
    /// Build and install packages from a package repository
    Install {
        /// Path to the target system
        path: PathBuf,
        /// Packages to install, in order
        #[arg(required = true)]
        packages: Vec<String>,
        /// Package repository holding packages.json and build scripts
        #[arg(short, long)]
        repo: PathBuf,
        /// Environment the packages must belong to
        #[arg(short, long, default_value = "target")]
        env: String,
        /// Ledger file (default: <path>/builds/installed.lock)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Print messages from underlying build processes
        #[arg(short, long)]
        verbose: bool,
        /// Measure build time
        #[arg(short, long)]
        time: bool,
        /// Number of concurrent jobs (default: number of CPUs)
        #[arg(short, long, env = "TODD_JOBS")]
        jobs: Option<usize>,
    },
    /// Show packages already finished for a target
    Status {
        /// Path to the target system
        path: PathBuf,
        /// Show the install ledger instead of the toolchain ledger
        #[arg(short, long)]
        installed: bool,
        /// Explicit ledger file
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Mark a target root as safe to build into
    Sign {
        /// Path to the target system
        path: PathBuf,
    },
}

/// Format a run duration as H:MM:SS
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Per-package progress lines for a run, finished or aborted
fn progress_lines(summary: &RunSummary) -> Vec<String> {
    let skipped = summary.skipped.iter().map(|name| format!("{}: already done", name));
    let built = summary.built.iter().map(|name| format!("{}: ok", name));
    skipped.chain(built).collect()
}

fn print_summary(summary: &RunSummary, label: &str, measure_time: bool) {
    for line in progress_lines(summary) {
        println!("{}", line);
    }
    println!(
        "{}: {} built, {} skipped",
        label,
        summary.built.len(),
        summary.skipped.len()
    );
    if measure_time {
        println!("{} time: {}", label, format_elapsed(summary.elapsed));
    }
}

/// Show what an aborted run finished before the failing package
fn report_failure(err: &Error, measure_time: bool) {
    if let Error::PackageFailed {
        package, progress, ..
    } = err
    {
        for line in progress_lines(progress) {
            println!("{}", line);
        }
        eprintln!("{}: failed", package);
        if measure_time {
            println!("time until failure: {}", format_elapsed(progress.elapsed));
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Toolchain {
            path,
            catalog,
            scripts,
            ledger,
            quiet,
            time,
            jobs,
        }) => {
            let jobs = jobs.unwrap_or_else(num_cpus::get);
            let config = BuildConfig::new(&path, jobs)?.with_quiet(quiet);
            info!(
                "Building cross toolchain into {} with {} jobs",
                config.target_root().display(),
                jobs
            );

            let request = ChainRequest {
                catalog: std::path::absolute(catalog)?,
                scripts_dir: std::path::absolute(scripts)?,
                ledger: ledger.map(std::path::absolute).transpose()?,
            };
            let summary = todd::orchestrator::run_chain(&config, &request)
                .inspect_err(|e| report_failure(e, time))?;
            print_summary(&summary, "cross toolchain", time);
            Ok(())
        }
        Some(Commands::Install {
            path,
            packages,
            repo,
            env,
            ledger,
            verbose,
            time,
            jobs,
        }) => {
            let jobs = jobs.unwrap_or_else(num_cpus::get);
            let config = BuildConfig::new(&path, jobs)?.with_quiet(!verbose);
            info!(
                "Installing {} package(s) into {} for environment '{}'",
                packages.len(),
                config.target_root().display(),
                env
            );

            let request = InstallRequest {
                repo_dir: std::path::absolute(repo)?,
                packages,
                environment: env,
                ledger: ledger.map(std::path::absolute).transpose()?,
            };
            let summary = todd::orchestrator::run_install(&config, &request)
                .inspect_err(|e| report_failure(e, time))?;
            print_summary(&summary, "all packages installed", time);
            Ok(())
        }
        Some(Commands::Status {
            path,
            installed,
            ledger,
        }) => {
            let config = BuildConfig::new(&path, 1)?;
            let ledger_path = ledger.unwrap_or_else(|| {
                if installed {
                    config.install_ledger_path()
                } else {
                    config.chain_ledger_path()
                }
            });
            let ledger = ProgressLedger::load(&ledger_path)?;

            if ledger.is_empty() {
                println!("No packages finished yet.");
            } else {
                println!("Finished packages:");
                for name in ledger.entries() {
                    println!("  {}", name);
                }
                println!("\nTotal: {} package(s)", ledger.len());
            }
            Ok(())
        }
        Some(Commands::Sign { path }) => {
            let config = BuildConfig::new(&path, 1)?;
            let sign_file = config.sign()?;
            println!("Signed target root: {}", sign_file.display());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("Todd Linux build system v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'todd --help' for usage information");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "0:00:59");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 7 * 60 + 5)), "3:07:05");
    }

    #[test]
    fn test_progress_lines() {
        let summary = RunSummary {
            built: vec!["ncurses".to_string(), "bash".to_string()],
            skipped: vec!["m4".to_string()],
            elapsed: Duration::from_secs(5),
        };
        assert_eq!(
            progress_lines(&summary),
            vec!["m4: already done", "ncurses: ok", "bash: ok"]
        );
        assert!(progress_lines(&RunSummary::default()).is_empty());
    }

    #[test]
    fn test_parse_install_command() {
        let cli = Cli::try_parse_from([
            "todd", "install", "/mnt/lfs", "bash", "less", "--repo", "/srv/repo", "-j", "4",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Install {
                packages,
                env,
                jobs,
                verbose,
                ..
            }) => {
                assert_eq!(packages, vec!["bash", "less"]);
                assert_eq!(env, "target");
                assert_eq!(jobs, Some(4));
                assert!(!verbose);
            }
            _ => panic!("expected install command"),
        }
    }

    #[test]
    fn test_install_requires_packages() {
        assert!(Cli::try_parse_from(["todd", "install", "/mnt/lfs", "--repo", "/srv/repo"]).is_err());
    }

    #[test]
    fn test_parse_toolchain_defaults() {
        let cli = Cli::try_parse_from(["todd", "toolchain", "/mnt/lfs", "-q"]).unwrap();
        match cli.command {
            Some(Commands::Toolchain {
                catalog,
                scripts,
                quiet,
                time,
                ..
            }) => {
                assert_eq!(catalog, PathBuf::from("builds.csv"));
                assert_eq!(scripts, PathBuf::from("build_scripts"));
                assert!(quiet);
                assert!(!time);
            }
            _ => panic!("expected toolchain command"),
        }
    }
}
