//! pdaval-cli - terminal front end for the pdaval validators
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use pdaval_core::{DistrictEntry, DistrictTable, Validator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdaval-cli")]
#[command(about = "Validate Sri Lankan NIC numbers and postal codes with pushdown automata")]
#[command(version)]
struct Cli {
    /// Print raw JSON results
    #[arg(long, global = true)]
    json: bool,

    /// YAML district table replacing the built-in one
    #[arg(long, env = "PDAVAL_DISTRICTS_FILE")]
    districts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start interactive REPL
    Repl,

    /// Validate a NIC number
    Nic {
        /// NIC number, 9 digits + V/X or 12 digits
        input: String,
    },

    /// Validate a postal code
    Postal {
        /// Five-digit postal code
        code: String,
    },

    /// List the district range table
    Districts,
}

fn load_districts(path: &Path) -> Result<Arc<DistrictTable>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let entries: Vec<DistrictEntry> = serde_yaml::from_str(&content)
        .map_err(|e| format!("failed to parse '{}': {}", path.display(), e))?;
    let table = DistrictTable::new(entries)?;
    tracing::debug!("loaded {} districts from {}", table.len(), path.display());
    Ok(Arc::new(table))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let validator = match &cli.districts_file {
        Some(path) => match load_districts(path) {
            Ok(table) => Validator::new(table),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
        None => Validator::default(),
    };

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(&validator, cli.json)?;
        }
        Some(cmd) => match commands::execute(&validator, cmd, cli.json) {
            Ok(output) => {
                println!("{}", output.text);
                if !output.success {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_districts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- name: Galle\n  prefix: \"80\"\n  province: Southern\n  ranges: [[80000, 80999]]"
        )
        .unwrap();

        let validator = Validator::new(load_districts(file.path()).unwrap());
        let result = validator.validate_postal_code("80000");
        assert!(result.accepted);
        assert_eq!(result.district.as_deref(), Some("Galle"));
        assert!(!validator.validate_postal_code("10100").accepted);
    }

    #[test]
    fn test_load_districts_errors() {
        let err = load_districts(Path::new("/nonexistent/districts.yaml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "- name: Galle\n  prefix: \"80\"\n  province: Southern\n  ranges: []")
            .unwrap();
        assert!(load_districts(file.path()).is_err());
    }
}
