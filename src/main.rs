use bugmail::cli::commands;
use bugmail::cli::{Cli, Commands};
use bugmail::logging::init_logging;
use bugmail::output::OutputContext;
use bugmail::{BugmailError, StructuredError};
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = cli.overrides();
    let ctx = OutputContext::from_flags(cli.json, cli.quiet);

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, None, &ctx),
        Commands::Poll => commands::poll::execute(&ctx, &overrides),
        Commands::Watch(args) => commands::watch::execute(args, &ctx, &overrides),
        Commands::Ingest(args) => commands::ingest::execute(args, &ctx, &overrides),
        Commands::Classify(args) => commands::classify::execute(args, &ctx, &overrides),
        Commands::List(args) => commands::list::execute(args, &ctx, &overrides),
        Commands::Show(args) => commands::show::execute(args, &ctx, &overrides),
        Commands::Mark(args) => commands::mark::execute(args, &ctx, &overrides),
        Commands::Delete(args) => commands::delete::execute(args, &ctx, &overrides),
        Commands::History(args) => commands::history::execute(args, &ctx, &overrides),
        Commands::Stats(args) => commands::stats::execute(args, &ctx, &overrides),
        Commands::Config { command } => commands::config::execute(command, &ctx, &overrides),
        Commands::Version => commands::version::execute(&ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &BugmailError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
