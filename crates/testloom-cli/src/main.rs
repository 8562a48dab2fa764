use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use testloom_core::{PipelineConfig, PlanRequest};

mod commands;
mod console;

use commands::{GenerationArgs, RunOptions};
use console::Console;

/// Testloom - constrained synthetic test data from data dictionaries
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate test-case descriptions for every dictionary row
    Describe {
        /// Raw data dictionary (CSV)
        dictionary: PathBuf,

        /// Formatted dictionary to write
        #[arg(short, long, default_value = "formatted_dictionary.csv")]
        output: PathBuf,
    },

    /// Rewrite descriptions in light of reviewer feedback
    Refine {
        /// Formatted dictionary (CSV)
        formatted: PathBuf,

        /// Feedback applied to every field
        #[arg(long)]
        feedback: String,

        /// Where to write the result (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute and print an invalidation plan
    Plan {
        /// Number of records (default: from configuration)
        #[arg(long)]
        rows: Option<usize>,

        /// Number of fields
        #[arg(long)]
        cols: usize,

        /// Minimum invalid values per record
        #[arg(long)]
        min_row: Option<usize>,

        /// Minimum invalid values per column
        #[arg(long)]
        min_col: Option<usize>,

        /// Probability of an invalid cell before repair
        #[arg(long)]
        fraction: Option<f64>,

        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Generate a synthetic dataset from a formatted dictionary
    Synthesize {
        /// Formatted dictionary (CSV)
        formatted: PathBuf,

        #[command(flatten)]
        generation: GenerationArgs,

        /// Dataset to write
        #[arg(short, long, default_value = "synthetic_data.csv")]
        output: PathBuf,
    },

    /// Validate a dataset against the dictionary's rules
    Validate {
        /// Formatted dictionary (CSV)
        formatted: PathBuf,

        /// Dataset to validate (CSV)
        dataset: PathBuf,

        /// Also enforce length, numeric and alphanumeric rules
        #[arg(long)]
        strict: bool,

        /// Report to write
        #[arg(short, long, default_value = "validation_report.csv")]
        output: PathBuf,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Run the whole workflow: describe, refine, synthesize, validate
    Run {
        /// Raw data dictionary (CSV)
        dictionary: PathBuf,

        /// Reviewer feedback applied before synthesis
        #[arg(long)]
        feedback: Option<String>,

        #[command(flatten)]
        generation: GenerationArgs,

        /// Also enforce length, numeric and alphanumeric rules
        #[arg(long)]
        strict: bool,

        /// Directory for the three artifacts
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let console = Console::new(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Describe { dictionary, output } => {
            commands::describe(&config, console, &dictionary, &output).await?;
        }
        Commands::Refine {
            formatted,
            feedback,
            output,
        } => {
            commands::refine(&config, console, &formatted, &feedback, output.as_deref()).await?;
        }
        Commands::Plan {
            rows,
            cols,
            min_row,
            min_col,
            fraction,
            seed,
        } => {
            let generation = &config.generation;
            let request = PlanRequest::new(
                rows.unwrap_or(generation.record_count),
                cols,
                min_row.unwrap_or(generation.min_invalid_per_row),
                min_col.unwrap_or(generation.min_invalid_per_col),
            )
            .with_target_fraction(fraction.unwrap_or(generation.target_invalid_fraction));
            commands::plan(console, &request, seed)?;
        }
        Commands::Synthesize {
            formatted,
            generation,
            output,
        } => {
            let config = generation.apply(config);
            config.validate()?;
            commands::synthesize(&config, console, &formatted, generation.seed, &output).await?;
        }
        Commands::Validate {
            formatted,
            dataset,
            strict,
            output,
            json,
        } => {
            let strict = strict || config.validation.strict;
            let config = config.with_strict_validation(strict);
            commands::validate(&config, console, &formatted, &dataset, &output, json).await?;
        }
        Commands::Run {
            dictionary,
            feedback,
            generation,
            strict,
            out_dir,
        } => {
            let strict = strict || config.validation.strict;
            let config = generation.apply(config).with_strict_validation(strict);
            let opts = RunOptions {
                dictionary,
                feedback,
                seed: generation.seed,
                out_dir,
            };
            commands::run(config, console, opts).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_arguments() {
        let cli = Cli::try_parse_from([
            "testloom", "plan", "--rows", "10", "--cols", "4", "--min-row", "2", "--min-col", "3",
            "--seed", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                rows,
                cols,
                min_row,
                min_col,
                seed,
                fraction,
            } => {
                assert_eq!((rows, cols, min_row, min_col), (Some(10), 4, Some(2), Some(3)));
                assert_eq!(seed, Some(7));
                assert_eq!(fraction, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "testloom",
            "validate",
            "formatted.csv",
            "data.csv",
            "--strict",
            "--verbose",
            "--config",
            "testloom.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("testloom.json")));
        assert!(matches!(cli.command, Commands::Validate { strict: true, .. }));
    }

    #[test]
    fn test_refine_requires_feedback() {
        assert!(Cli::try_parse_from(["testloom", "refine", "formatted.csv"]).is_err());
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testloom.json");
        std::fs::write(&path, r#"{"generation": {"record_count": 7}}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.generation.record_count, 7);
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
