//! reqkit - check, edit and document Python requirements manifests

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use reqkit_pkg::{ExportFormat, Platform};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod add;
mod check;
mod export;
mod init;
mod list;
mod project;
mod remove;
mod setup;

use project::Project;

#[derive(Parser)]
#[command(name = "reqkit")]
#[command(version)]
#[command(about = "Check, edit and document requirements.txt manifests", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Manifest to operate on (defaults to the one named in reqkit.toml)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate manifests and report problems
    Check {
        /// Files to check (defaults to the project manifest)
        files: Vec<PathBuf>,

        /// Check every requirements*.txt file in the current directory
        #[arg(long, conflicts_with = "files")]
        all: bool,
    },

    /// List declared requirements
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a requirement, replacing any existing declaration of the package
    Add {
        /// Requirement, e.g. "pandas[performance]>=2"
        requirement: String,
    },

    /// Remove a requirement
    Remove {
        /// Package name
        name: String,
    },

    /// Print virtual environment setup instructions
    Setup {
        /// Target platform (windows or posix; defaults to the current one)
        #[arg(long)]
        platform: Option<Platform>,

        /// Print bare commands only
        #[arg(long)]
        script: bool,
    },

    /// Create a new manifest
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,

        /// Start the manifest with setup instructions
        #[arg(long)]
        with_header: bool,

        /// Also write a default reqkit.toml
        #[arg(long)]
        config: bool,
    },

    /// Export requirements as JSON or TOML
    Export {
        /// Output format (json or toml)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = Project::current(cli.manifest.as_deref())?;

    match cli.command {
        Commands::Check { files, all } => {
            let options = check::CheckOptions { files, all };
            let result = check::check_manifests(&project, &options)?;
            result.print_summary();
            if !result.is_ok() {
                bail!("check failed with {} error(s)", result.error_count());
            }
        }

        Commands::List { json } => {
            list::list_requirements(&project, json)?;
        }

        Commands::Add { requirement } => {
            add::add_requirement(&project, &requirement)?;
        }

        Commands::Remove { name } => {
            remove::remove_requirement(&project, &name)?;
        }

        Commands::Setup { platform, script } => {
            setup::print_setup(&project, setup::SetupOptions { platform, script });
        }

        Commands::Init {
            force,
            with_header,
            config,
        } => {
            let options = init::InitOptions {
                force,
                with_header,
                config,
            };
            init::init_manifest(&project, options)?;
        }

        Commands::Export { format, output } => {
            let options = export::ExportOptions { format, output };
            export::export_manifest(&project, &options)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_defaults() {
        let cli = Cli::try_parse_from(["reqkit", "check"]).unwrap();
        match cli.command {
            Commands::Check { files, all } => {
                assert!(files.is_empty());
                assert!(!all);
            }
            _ => panic!("Expected Check command"),
        }
        assert_eq!(cli.verbose, 0);
        assert!(cli.manifest.is_none());
    }

    #[test]
    fn test_check_all_conflicts_with_files() {
        let result = Cli::try_parse_from(["reqkit", "check", "--all", "requirements.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "reqkit",
            "list",
            "-vv",
            "--manifest",
            "requirements/dev.txt",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.manifest, Some(PathBuf::from("requirements/dev.txt")));
        assert!(matches!(cli.command, Commands::List { json: false }));
    }

    #[test]
    fn test_add_requirement_argument() {
        let cli = Cli::try_parse_from(["reqkit", "add", "pandas[performance]>=2"]).unwrap();
        match cli.command {
            Commands::Add { requirement } => assert_eq!(requirement, "pandas[performance]>=2"),
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_setup_platform() {
        let cli = Cli::try_parse_from(["reqkit", "setup", "--platform", "windows", "--script"])
            .unwrap();
        match cli.command {
            Commands::Setup { platform, script } => {
                assert_eq!(platform, Some(Platform::Windows));
                assert!(script);
            }
            _ => panic!("Expected Setup command"),
        }

        assert!(Cli::try_parse_from(["reqkit", "setup", "--platform", "beos"]).is_err());
    }

    #[test]
    fn test_export_format() {
        let cli = Cli::try_parse_from(["reqkit", "export", "--format", "toml"]).unwrap();
        match cli.command {
            Commands::Export { format, output } => {
                assert_eq!(format, ExportFormat::Toml);
                assert!(output.is_none());
            }
            _ => panic!("Expected Export command"),
        }

        let cli = Cli::try_parse_from(["reqkit", "export"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_init_flags() {
        let cli = Cli::try_parse_from(["reqkit", "init", "--with-header", "--force"]).unwrap();
        match cli.command {
            Commands::Init {
                force,
                with_header,
                config,
            } => {
                assert!(force);
                assert!(with_header);
                assert!(!config);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["reqkit"]).is_err());
    }
}
