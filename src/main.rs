use std::io;

use anyhow::Result;
use clap::Parser;
use gotest_util::{
    cli::{AppContext, Cli, Commands},
    cli_ext::commands::{self, Session},
    infra::config::{self, Config},
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    let config = config::load_config()?;
    init_tracing(cli.verbose, cli.quiet, &config);

    // Environments are only built for commands that need them
    let session = || Session::from_flags(&cli.build, &config);

    match cli.command {
        Commands::List(args) => commands::list(args, &session()?),
        Commands::Env(args) => commands::env(args, &session()?, &ctx),
        Commands::Function(args) => commands::function(args, &session()?),
        Commands::Escape(args) => commands::escape(args),
        Commands::Run(args) => commands::run(args, &session()?, &config),
        Commands::Init(args) => config::init(args, &ctx),
        Commands::Completions(args) => gotest_util::completion::run(args, &ctx),
    }
}

/// Log to stderr so stdout carries only command output.
/// RUST_LOG wins, then -v, then the configured level.
fn init_tracing(verbose: u8, quiet: bool, config: &Config) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => config.log_level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
