// CLI argument definitions using Clap

use clap::{ArgMatches, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::FormatConfig;

/// Test report formatter loader
#[derive(Parser, Debug)]
#[command(name = "testfmt")]
#[command(author = "testfmt contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Render test event streams through pluggable formatters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // Flatten RenderArgs so `testfmt -f doc events.jsonl` renders without a subcommand
    #[command(flatten)]
    pub render_args: RenderArgs,

    /// Directory searched for formatter manifests (repeatable)
    #[arg(short = 'I', long = "load-path", value_name = "DIR", global = true)]
    pub load_path: Vec<PathBuf>,

    /// Adapt formatters that use the legacy interface instead of skipping them
    #[arg(long, global = true, default_value_t = false)]
    pub legacy_formatters: bool,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value_t = false)]
    pub no_color: bool,

    /// Print shell completion script (bash, zsh, fish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "powershell"])]
    pub completion: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a JSON-lines event stream (default)
    Render(RenderArgs),

    /// List known formatters
    List(ListArgs),

    /// Show how an identifier resolves
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Event stream to render; stdin when absent or "-"
    #[arg(value_name = "EVENTS")]
    pub events: Option<PathBuf>,

    /// Formatter to use: short code or qualified type name (repeatable)
    #[arg(short = 'f', long = "format", value_name = "FORMATTER")]
    pub format: Vec<String>,

    /// Output for the preceding --format ("-" for stdout)
    #[arg(short = 'o', long = "out", value_name = "PATH")]
    pub out: Vec<String>,

    /// Report the slowest examples
    #[arg(long, default_value_t = false)]
    pub profile: bool,

    /// Where deprecation warnings go
    #[arg(long = "deprecation-out", value_name = "PATH")]
    pub deprecation_out: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Short code or qualified type name
    #[arg(required = true)]
    pub identifier: String,

    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Formatters requested on the command line, with their outputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatSelection {
    pub formats: Vec<FormatConfig>,
    /// An `--out` given before any `--format`; applies to the default formatter
    pub default_output: Option<String>,
}

impl Cli {
    pub fn get_render_args(&self) -> &RenderArgs {
        match &self.command {
            Some(Commands::Render(args)) => args,
            _ => &self.render_args,
        }
    }
}

/// Pair every `--out` with the closest `--format` before it.
///
/// Clap's derive API drops argument positions, so this reads them from the raw matches.
pub fn format_selection(matches: &ArgMatches) -> FormatSelection {
    let matches = match matches.subcommand() {
        Some(("render", sub)) => sub,
        _ => matches,
    };

    let mut formats: Vec<(usize, FormatConfig)> = indexed(matches, "format")
        .into_iter()
        .map(|(index, name)| (index, FormatConfig { name, output: None }))
        .collect();

    let mut selection = FormatSelection::default();
    for (index, out) in indexed(matches, "out") {
        match formats.iter_mut().rev().find(|(at, _)| *at < index) {
            Some((_, format)) => format.output = Some(out),
            None => selection.default_output = Some(out),
        }
    }

    selection.formats = formats.into_iter().map(|(_, format)| format).collect();
    selection
}

fn indexed(matches: &ArgMatches, id: &str) -> Vec<(usize, String)> {
    match (
        matches.indices_of(id),
        matches.get_many::<String>(id),
    ) {
        (Some(indices), Some(values)) => indices.zip(values.cloned()).collect(),
        _ => Vec::new(),
    }
}
