// Commands module - handles CLI command execution

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub mod list;
pub mod render;
pub mod resolve;

pub use list::handle_list;
pub use render::handle_render;
pub use resolve::handle_resolve;

use crate::cli::Cli;
use crate::config::Config;
use crate::loader::{Loader, ManifestLoader, ProbeAdapter};
use crate::report::{NotificationRegistry, Reporter};

/// Settings shared by every command that builds a [`Loader`]
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    pub load_path: Vec<PathBuf>,
    pub legacy_formatters: bool,
    pub default_formatter: Option<String>,
    pub profile_examples: bool,
}

impl LoaderOptions {
    /// Command-line flags layered over the config file
    pub fn from_cli(cli: &Cli, config: &Config) -> Self {
        let mut load_path = cli.load_path.clone();
        load_path.extend(config.load_path());

        Self {
            load_path,
            legacy_formatters: cli.legacy_formatters || config.formatters.legacy_formatters,
            default_formatter: Some(config.formatters.default.clone()),
            profile_examples: cli.get_render_args().profile || config.formatters.profile_examples,
        }
    }

    pub fn build(&self) -> Loader {
        // Types loaded from manifests register into this run's copy only
        let snapshot = NotificationRegistry::global().snapshot();
        let mut loader = Loader::from_snapshot(Reporter::new(), snapshot);

        if !self.load_path.is_empty() {
            debug!("Formatter load path: {:?}", self.load_path);
            loader = loader.with_type_loader(ManifestLoader::new(self.load_path.clone()));
        }
        if self.legacy_formatters {
            loader = loader.with_legacy_adapter(Arc::new(ProbeAdapter));
        }
        if let Some(default) = &self.default_formatter {
            loader.set_default_formatter(default.clone());
        }
        loader.set_profile_examples(self.profile_examples);
        loader
    }
}

/// Handle shell completion
pub fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        _ => {
            anyhow::bail!(
                "Unsupported shell: {}. Supported: bash, zsh, fish, powershell",
                shell_type
            );
        }
    };

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut stdout = std::io::stdout();

    generate(shell, &mut cmd, name, &mut stdout);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DEFAULT_FORMATTER;

    #[test]
    fn test_options_build_configured_loader() {
        let options = LoaderOptions {
            load_path: vec![PathBuf::from("formatters")],
            legacy_formatters: true,
            default_formatter: Some("doc".to_string()),
            profile_examples: true,
        };

        let loader = options.build();

        assert!(loader.resolver().has_loader());
        assert!(loader.has_legacy_adapter());
        assert_eq!(loader.default_formatter(), "doc");
        assert!(loader.reporter().profile_examples());
    }

    #[test]
    fn test_default_options() {
        let loader = LoaderOptions::default().build();

        assert!(!loader.resolver().has_loader());
        assert!(!loader.has_legacy_adapter());
        assert_eq!(loader.default_formatter(), DEFAULT_FORMATTER);
    }

    #[test]
    fn test_loader_gets_its_own_registry_copy() {
        let loader = LoaderOptions::default().build();

        assert!(!Arc::ptr_eq(loader.registry(), &NotificationRegistry::global()));
        assert!(loader.registry().contains(crate::formatters::names::PROGRESS));
    }
}
