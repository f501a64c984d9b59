//! marquee CLI
//!
//! Command-line interface for querying a media library database.

mod commands;
mod error;
mod settings;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marquee_core::EntityKind;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use commands::QueryArgs;
use commands::query::Output;
use error::CliError;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Filter and query a media library", long_about = None)]
struct Cli {
    /// Library database (defaults to the settings file, then the data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the library database, or check an existing one
    Init,

    /// List entities matching a filter
    Query {
        /// Entity to query (scenes, images, galleries, performers, studios, tags, groups)
        entity: EntityKind,

        #[command(flatten)]
        args: QueryArgs,

        /// Print matching ids only, one per line
        #[arg(long, conflicts_with = "json")]
        ids_only: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the SQL a query would run, without running it
    Explain {
        /// Entity to query
        entity: EntityKind,

        #[command(flatten)]
        args: QueryArgs,
    },

    /// Show or locate the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective settings
    Show,
    /// Print the settings file path
    Path,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Init => commands::init::run_init(cli.db),
        Commands::Query {
            entity,
            args,
            ids_only,
            json,
        } => {
            let output = if ids_only {
                Output::Ids
            } else if json {
                Output::Json
            } else {
                Output::Table
            };
            let lib = commands::Library::open(cli.db)?;
            commands::query::run_query(&lib, entity, &args, output)
        }
        Commands::Explain { entity, args } => {
            let lib = commands::Library::open(cli.db)?;
            commands::explain::run_explain(&lib, entity, &args)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("{} {e}", "Error:".if_supports_color(Stderr, |t| t.red()));
        std::process::exit(1);
    }
}
