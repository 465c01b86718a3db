use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about = "Select and check PULP-NN kernel test cases")]
struct Cli {
    /// Configuration file: TOML, JSON (`.json`) or a legacy setup script (`.py`).
    ///
    /// Without it, `pulpnn_setup.toml` or `PulpNN.toml` is searched for in the current
    /// directory and its parents, and the `PULPNN_*` environment variables apply.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// More output (repeatable).
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved configuration.
    Show {
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
    /// Validate the configuration.
    Check,
    /// List the test cases the configuration generates.
    Variants,
    /// Write the default configuration.
    Init {
        /// Destination file.
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
    Script,
}

fn main() {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let load = || commands::load_config(cli.config.as_deref());
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Show { format } => commands::show(&load()?, format, &mut stdout),
        Command::Check => commands::check(&load()?, &mut stdout),
        Command::Variants => commands::variants(&load()?, &mut stdout),
        Command::Init {
            path,
            format,
            force,
        } => commands::init(&path, format, force),
    }
}
