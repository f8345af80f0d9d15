// Manifest loader - defines external formatter types from TOML files on the load path

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::resolver::{LoadContext, LoadOutcome, TypeLoader, is_qualified_name};
use crate::formatters::{ExternalFormatter, FormatterType, FormatterTypeRef};
use crate::report::Notification;

pub const MANIFEST_EXTENSION: &str = "toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterManifest {
    #[serde(rename = "formatter", default)]
    pub formatters: Vec<FormatterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterEntry {
    /// Qualified type name, e.g. `Acme::DotsFormatter`
    pub name: String,

    /// Qualified name of an already defined supertype
    #[serde(default)]
    pub extends: Option<String>,

    /// Registered notifications; absent for legacy formatters
    #[serde(default)]
    pub notifications: Option<Vec<String>>,

    /// Notification methods the executable implements (defaults to `notifications`)
    #[serde(default)]
    pub responds_to: Option<Vec<String>>,

    /// Executable, relative to the manifest's directory
    pub command: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// A manifest found on the load path
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredManifest {
    /// Path a qualified name must derive to for this manifest to load
    pub require_path: String,
    pub file: PathBuf,
}

fn parse_notifications(names: &[String]) -> Result<Vec<Notification>> {
    names
        .iter()
        .map(|name| {
            Notification::parse(name).ok_or_else(|| anyhow!("Unknown notification '{}'", name))
        })
        .collect()
}

/// Dynamic-load strategy reading `<dir>/<path>.toml` from each load-path directory
#[derive(Debug, Clone, Default)]
pub struct ManifestLoader {
    load_paths: Vec<PathBuf>,
}

impl ManifestLoader {
    pub fn new(load_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            load_paths: load_paths.into_iter().collect(),
        }
    }

    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }

    /// First manifest file for `path` on the load path
    pub fn find(&self, path: &str) -> Option<PathBuf> {
        self.load_paths
            .iter()
            .map(|dir| dir.join(format!("{}.{}", path, MANIFEST_EXTENSION)))
            .find(|candidate| candidate.is_file())
    }

    /// Every manifest below the load path, in directory order
    pub fn discover(&self) -> Vec<DiscoveredManifest> {
        let mut found = Vec::new();

        for dir in &self.load_paths {
            let walker = walkdir::WalkDir::new(dir).sort_by_file_name().into_iter();
            for entry in walker.flatten() {
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().is_none_or(|e| e != MANIFEST_EXTENSION)
                {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                let require_path = relative
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                found.push(DiscoveredManifest {
                    require_path,
                    file: path.to_path_buf(),
                });
            }
        }

        found
    }

    pub fn parse(content: &str) -> Result<FormatterManifest> {
        toml::from_str(content).context("Invalid formatter manifest")
    }

    fn prepare_entry(
        entry: FormatterEntry,
        base_dir: &Path,
        cx: &LoadContext<'_>,
        siblings: &[PreparedEntry],
    ) -> Result<PreparedEntry> {
        if !is_qualified_name(&entry.name) {
            anyhow::bail!("Invalid formatter name '{}'", entry.name);
        }

        let notifications = entry
            .notifications
            .as_deref()
            .map(parse_notifications)
            .transpose()
            .with_context(|| format!("Invalid notifications for {}", entry.name))?;
        let responds_to = match entry.responds_to.as_deref() {
            Some(names) => parse_notifications(names)
                .with_context(|| format!("Invalid responds_to for {}", entry.name))?,
            None => notifications.clone().unwrap_or_default(),
        };

        let mut builder = FormatterType::builder(&entry.name).responds_to(responds_to);
        if let Some(parent_name) = &entry.extends {
            // a parent may be defined earlier in the same manifest
            let parent = siblings
                .iter()
                .find(|p| p.formatter_type.name() == parent_name)
                .map(|p| Arc::clone(&p.formatter_type))
                .or_else(|| cx.namespace.lookup(parent_name))
                .with_context(|| {
                    format!("{} extends unknown formatter {}", entry.name, parent_name)
                })?;
            builder = builder.extends(&parent);
        }

        let command = base_dir.join(&entry.command);
        let formatter_type = builder.build(move |ty, outputs| {
            Ok(Arc::new(ExternalFormatter::new(ty.name(), command.clone(), outputs)))
        });

        Ok(PreparedEntry {
            formatter_type,
            notifications,
        })
    }
}

/// A manifest entry that passed validation but is not defined yet
struct PreparedEntry {
    formatter_type: FormatterTypeRef,
    notifications: Option<Vec<Notification>>,
}

impl TypeLoader for ManifestLoader {
    fn load(&self, path: &str, cx: &mut LoadContext<'_>) -> Result<LoadOutcome> {
        let Some(file) = self.find(path) else {
            debug!("No formatter manifest for {} on {:?}", path, self.load_paths);
            return Ok(LoadOutcome::NotFound);
        };

        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read formatter manifest: {}", file.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Failed to parse formatter manifest: {}", file.display()))?;

        let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
        let mut prepared = Vec::with_capacity(manifest.formatters.len());
        for entry in manifest.formatters {
            let entry = Self::prepare_entry(entry, base_dir, cx, &prepared)?;
            prepared.push(entry);
        }

        // Nothing is defined unless every entry is valid
        for entry in prepared {
            if let Some(notifications) = entry.notifications {
                cx.registry.register(&entry.formatter_type, notifications);
            }
            info!("Defined external formatter {}", entry.formatter_type.name());
            cx.namespace.define(entry.formatter_type);
        }

        Ok(LoadOutcome::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = ManifestLoader::parse(
            r#"
[[formatter]]
name = "Acme::Dots"
extends = "Testfmt::Formatters::BaseFormatter"
notifications = ["example_passed", "example_failed"]
command = "bin/dots"

[[formatter]]
name = "Acme::Legacy"
command = "bin/legacy"
"#,
        )
        .unwrap();

        assert_eq!(manifest.formatters.len(), 2);
        assert_eq!(manifest.formatters[0].notifications.as_ref().unwrap().len(), 2);
        assert!(manifest.formatters[1].notifications.is_none());
    }

    #[test]
    fn test_unknown_notification_is_rejected() {
        let err = parse_notifications(&["example_passed".to_string(), "explode".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("explode"));
    }
}
