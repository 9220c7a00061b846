// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn target_path_arg() -> Arg {
    Arg::new("path").required(true).help("Path to the target system")
}

fn jobs_arg() -> Arg {
    Arg::new("jobs")
        .short('j')
        .long("jobs")
        .value_name("N")
        .help("Number of concurrent jobs (default: number of CPUs, or TODD_JOBS)")
}

fn time_arg() -> Arg {
    Arg::new("time")
        .short('t')
        .long("time")
        .action(ArgAction::SetTrue)
        .help("Measure build time")
}

fn ledger_arg() -> Arg {
    Arg::new("ledger")
        .long("ledger")
        .value_name("FILE")
        .help("Ledger file of finished packages")
}

fn build_cli() -> Command {
    Command::new("todd")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Todd Linux Contributors")
        .about("Resumable from-source Linux build system")
        .subcommand_required(false)
        .subcommand(
            Command::new("toolchain")
                .about("Build the cross toolchain chain into a target root")
                .arg(target_path_arg())
                .arg(
                    Arg::new("catalog")
                        .short('c')
                        .long("catalog")
                        .default_value("builds.csv")
                        .help("Chain catalog (package;src_packages;build_script records)"),
                )
                .arg(
                    Arg::new("scripts")
                        .short('s')
                        .long("scripts")
                        .default_value("build_scripts")
                        .help("Directory holding the chain's build scripts"),
                )
                .arg(ledger_arg())
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Don't print messages from underlying build processes"),
                )
                .arg(time_arg())
                .arg(jobs_arg()),
        )
        .subcommand(
            Command::new("install")
                .about("Build and install packages from a package repository")
                .arg(target_path_arg())
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("Packages to install, in order"),
                )
                .arg(
                    Arg::new("repo")
                        .short('r')
                        .long("repo")
                        .required(true)
                        .help("Package repository holding packages.json and build scripts"),
                )
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .default_value("target")
                        .help("Environment the packages must belong to"),
                )
                .arg(ledger_arg())
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Print messages from underlying build processes"),
                )
                .arg(time_arg())
                .arg(jobs_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Show packages already finished for a target")
                .arg(target_path_arg())
                .arg(
                    Arg::new("installed")
                        .short('i')
                        .long("installed")
                        .action(ArgAction::SetTrue)
                        .help("Show the install ledger instead of the toolchain ledger"),
                )
                .arg(ledger_arg()),
        )
        .subcommand(
            Command::new("sign")
                .about("Mark a target root as safe to build into")
                .arg(target_path_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("todd.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
