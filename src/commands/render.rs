// Render command - replay an event stream through the configured formatters

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::cli::{FormatSelection, RenderArgs, destination};
use crate::config::{Config, FormatConfig};
use crate::loader::Loader;
use crate::report;
use crate::utils::{Destination, Output};

use super::LoaderOptions;

/// Returns the number of failed examples
pub fn handle_render(
    args: &RenderArgs,
    selection: &FormatSelection,
    options: &LoaderOptions,
    config: &Config,
) -> Result<usize> {
    let mut loader = options.build();
    add_formatters(&mut loader, selection, config)?;

    let output = selection
        .default_output
        .as_deref()
        .map(destination)
        .unwrap_or(Destination::Sink(Output::Stdout));
    let deprecation_output = destination(
        args.deprecation_out
            .as_deref()
            .unwrap_or(&config.formatters.deprecation_output),
    );
    loader.setup_defaults(output, deprecation_output)?;
    info!("Rendering with {} formatter(s)", loader.formatters().len());

    let reader = open_events(args.events.as_deref())?;
    let failed = report::replay(reader, loader.reporter_mut())?;

    debug!("Replay finished with {} failure(s)", failed);
    Ok(failed)
}

/// Formatters from the command line win over the config file's list
fn add_formatters(
    loader: &mut Loader,
    selection: &FormatSelection,
    config: &Config,
) -> Result<()> {
    let formats: &[FormatConfig] = if selection.formats.is_empty() {
        &config.formatters.format
    } else {
        &selection.formats
    };

    for format in formats {
        let output = format
            .output
            .as_deref()
            .map(destination)
            .unwrap_or(Destination::Sink(Output::Stdout));
        loader
            .add_from_config(&format.name, [output])
            .with_context(|| format!("Failed to add formatter '{}'", format.name))?;
    }

    Ok(())
}

fn open_events(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open event stream: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}
