//! rgss — convert RGSS game data files to and from YAML.

mod commands;
mod config;
mod formats;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use rgss_core::Dialect;

use commands::Settings;
use config::RgssConfig;

#[derive(Parser)]
#[command(name = "rgss", version, about = "Convert RGSS data files to and from YAML")]
struct Cli {
    /// Log every file and per-object diagnostics
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Engine dialect (xp, vx, ace); defaults to the data file's extension
    #[arg(long, global = true)]
    dialect: Option<Dialect>,
    /// Disable lossy normalisations so repeated conversions are stable
    #[arg(long, global = true)]
    round_trip: bool,
    /// Maximum cells per Table row in documents (0 for unbounded)
    #[arg(long, global = true)]
    table_width: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single file
    Convert {
        /// Source file (.rxdata/.rvdata/.rvdata2 or .yaml)
        src: PathBuf,
        /// Destination file
        dest: PathBuf,
    },
    /// Convert comma-separated lists of files pairwise
    ConvertList {
        /// Source files, comma separated
        #[arg(long)]
        input: String,
        /// Destination files, comma separated
        #[arg(long)]
        output: String,
    },
    /// Convert every file in a directory
    ConvertDir {
        /// Source directory
        src_dir: PathBuf,
        /// Destination directory
        dest_dir: PathBuf,
        /// Extension for the converted files (e.g. .yaml, .rvdata2)
        #[arg(long)]
        target_ext: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use env_logger::{Builder, Env};

    let default = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config_optional(&cwd)?;
    let settings = resolve_settings(&cli, &config);

    match cli.command {
        Commands::Convert { src, dest } => commands::convert::run(&src, &dest, &settings),
        Commands::ConvertList { input, output } => commands::convert::run_list(
            &commands::convert::parse_list(&input),
            &commands::convert::parse_list(&output),
            &settings,
        ),
        Commands::ConvertDir {
            src_dir,
            dest_dir,
            target_ext,
        } => commands::convert_dir::run(
            &src_dir,
            &dest_dir,
            &target_ext,
            &config.discovery.exclude,
            &settings,
        )
        .map(|_| ()),
    }
}

/// Flags win over `rgss.toml`; a width of 0 means unbounded.
fn resolve_settings(cli: &Cli, config: &RgssConfig) -> Settings {
    let conversion = &config.conversion;
    Settings {
        dialect: cli.dialect.or(conversion.dialect),
        round_trip: cli.round_trip || conversion.round_trip.unwrap_or(false),
        table_width: cli
            .table_width
            .or(conversion.table_width)
            .filter(|width| *width > 0),
    }
}

/// Load `rgss.toml` from the working directory upward, or fall back to defaults.
fn load_config_optional(cwd: &Path) -> anyhow::Result<RgssConfig> {
    match RgssConfig::find_and_load(cwd)? {
        Some((config, dir)) => {
            log::debug!("using {}", dir.join(config::CONFIG_FILE).display());
            Ok(config)
        }
        None => Ok(RgssConfig::default()),
    }
}
