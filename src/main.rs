use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process,
};

use capql::cli::{self, CliError, FilterOptions, SessionOptions};
use clap::{Args, Parser as ClapParser, Subcommand};
use log::info;

#[derive(ClapParser)]
#[command(name = "capql")]
#[command(about = "capql - filter and assert over streamed JSON capture records")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// TOML configuration file (macros, metadata interval)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Define a macro, e.g. --macro 'http~proto.name == "http"'
    #[arg(short = 'm', long = "macro", global = true)]
    macros: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check query syntax, printing OK or the syntax error
    Validate {
        /// The query to check
        query: String,
    },

    /// Print the records that match a query
    Filter {
        /// The query to run
        query: String,

        /// Newline-delimited JSON records (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Interleave /metadata progress frames
        #[arg(long)]
        metadata: bool,
    },

    /// Check rule(description:, query:, assert:) declarations against records
    Rules {
        /// The rule declarations
        rules: String,

        /// Newline-delimited JSON records (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = SessionOptions {
        config: cli.session.config,
        macros: cli.session.macros,
    };
    let mut session = options.build()?;
    let stdout = io::stdout();

    match cli.command {
        Commands::Validate { query } => {
            cli::execute_check(&session, &query)?;
            println!("OK");
        }
        Commands::Filter {
            query,
            input,
            metadata,
        } => {
            let input = open_input(input)?;
            let options = FilterOptions { query, metadata };
            let stats = cli::execute_filter(&mut session, &options, input, &mut stdout.lock())?;
            info!(
                "{} of {} records matched",
                stats.number_of_written, stats.total
            );
        }
        Commands::Rules { rules, input } => {
            let input = open_input(input)?;
            let summary = cli::execute_rules(&session, &rules, input, &mut stdout.lock())?;
            info!(
                "{} records: {} passed, {} failed, {} skipped",
                summary.records, summary.passed, summary.failed, summary.skipped
            );
            if summary.failed > 0 {
                return Err(CliError::RulesFailed {
                    failed: summary.failed,
                    checked: summary.passed + summary.failed,
                });
            }
        }
    }
    Ok(())
}

fn open_input(path: Option<PathBuf>) -> Result<Box<dyn BufRead>, CliError> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None if !atty::is(atty::Stream::Stdin) => Ok(Box::new(io::stdin().lock())),
        None => Err(CliError::NoInput),
    }
}
