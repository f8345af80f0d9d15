pub mod args;

pub use args::{
    Cli, Commands, FormatSelection, ListArgs, RenderArgs, ResolveArgs, format_selection,
};

use crate::utils::{Destination, Output};

/// Output named on the command line or in a config file
pub fn destination(spec: &str) -> Destination {
    match spec {
        "-" | "stdout" => Destination::Sink(Output::Stdout),
        "stderr" => Destination::Sink(Output::Stderr),
        path => Destination::from(path),
    }
}
