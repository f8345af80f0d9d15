// Main entry point for testfmt

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};
use tracing::info;

use testfmt::cli::{self, Cli, Commands};
use testfmt::commands::{self, LoaderOptions};
use testfmt::config::Config;
use testfmt::logging;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run() -> Result<i32> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    logging::init(cli.verbose);
    info!("Starting testfmt v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from file (if exists)
    let config = Config::load().unwrap_or_default();

    if cli.no_color || !config.formatters.color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Handle completion flag
    if let Some(shell_type) = &cli.completion {
        commands::handle_completion(shell_type)?;
        return Ok(0);
    }

    let options = LoaderOptions::from_cli(&cli, &config);

    match &cli.command {
        Some(Commands::List(args)) => commands::handle_list(args, &options).map(|_| 0),
        Some(Commands::Resolve(args)) => commands::handle_resolve(args, &options).map(|_| 0),
        Some(Commands::Render(_)) | None => {
            let selection = cli::format_selection(&matches);
            let failed =
                commands::handle_render(cli.get_render_args(), &selection, &options, &config)?;
            Ok(if failed > 0 { 1 } else { 0 })
        }
    }
}
