use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaultfile::cli::{Cli, Commands};

/// Environment variable holding the log filter (e.g. `debug`).
const LOG_ENV_VAR: &str = "VAULTFILE_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => vaultfile::cli::commands::list::execute(&cli),
        Commands::Set {
            ref name,
            ref value,
        } => vaultfile::cli::commands::set::execute(&cli, name.as_deref(), value.as_deref()),
        Commands::Get { ref name } => vaultfile::cli::commands::get::execute(&cli, name),
        Commands::Remove { ref name } => vaultfile::cli::commands::remove::execute(&cli, name),
        Commands::Completions { shell } => vaultfile::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        vaultfile::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `VAULTFILE_LOG` (default: warn).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
