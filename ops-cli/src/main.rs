use anyhow::Result;
use clap::{Parser, Subcommand};
use ops_cli::{caveat_report, init_tracing, membership_report, read_input, LogFormat, OpsConfig, OutputFormat};
use std::path::PathBuf;
use tracing::debug;

/// Authorization core developer tools
#[derive(Parser, Debug)]
#[command(name = "authzdb")]
#[command(about = "Inspect expansion memberships and compile caveat expressions")]
struct Args {
    /// Configuration file path (defaults to ./authzdb.yaml when present)
    #[arg(short, long, env = "AUTHZDB_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format, overrides the configuration
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Log format, overrides the configuration
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every subject found in expansion trees and the relationships behind it
    Membership {
        /// JSON file with one `{root, tree}` record or a list of them, `-` for stdin
        #[arg(short, long)]
        input: String,
    },
    /// Compile a caveat expression against encoded parameter types
    Caveat {
        /// JSON file mapping parameter names to type references, `-` for stdin
        #[arg(short, long)]
        parameters: String,

        /// Caveat name
        #[arg(short, long, default_value = "caveat")]
        name: String,

        /// Caveat expression
        #[arg(short, long)]
        expression: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = OpsConfig::load(args.config.as_deref())?;
    if args.verbose {
        config.log_level = "debug".to_string();
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(log_format) = args.log_format {
        config.log_format = log_format;
    }

    init_tracing(&config.log_level, config.log_format)?;
    debug!(?config, "Loaded configuration");

    let rendered = match args.command {
        Command::Membership { input } => membership_report(&read_input(&input)?, config.output)?,
        Command::Caveat {
            parameters,
            name,
            expression,
        } => caveat_report(&read_input(&parameters)?, &name, &expression, config.output)?,
    };

    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}
