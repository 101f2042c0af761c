mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn init_tracing(cli: &Cli) {
    // --quiet   -> off
    // --verbose -> RUST_LOG if set, otherwise info
    // default   -> warnings only; RUST_LOG is ignored so stdout stays clean
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    let ansi = std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Extract { input, output, compact } => {
            commands::extract::run(&input, &output, compact, cli.quiet)
        }
        Commands::Pack { input, output } => commands::pack::run(&input, &output, cli.quiet),
        Commands::Info { input } => commands::info::run(&input),
        Commands::Sections { input, tag, compact } => {
            commands::sections::run(&input, tag.as_deref(), compact)
        }
    }
}
