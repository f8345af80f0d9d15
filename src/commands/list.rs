// List command - known formatters, their codes and subscriptions

use anyhow::Result;
use serde::Serialize;

use crate::cli::ListArgs;
use crate::loader::{Loader, ManifestLoader, resolver};

use super::LoaderOptions;

#[derive(Debug, Serialize)]
struct FormatterListing {
    name: String,
    codes: Vec<&'static str>,
    parent: Option<String>,
    notifications: Vec<String>,
    legacy: bool,
}

#[derive(Debug, Serialize)]
struct ManifestListing {
    path: String,
    file: String,
}

fn listings(loader: &Loader) -> Vec<FormatterListing> {
    loader
        .resolver()
        .namespace()
        .types()
        .map(|formatter_type| {
            let codes = resolver::built_in_codes()
                .filter(|(_, name)| *name == formatter_type.name())
                .flat_map(|(codes, _)| codes.iter().copied())
                .collect();
            let notifications: Vec<String> = loader
                .subscriptions_for(formatter_type)
                .into_iter()
                .map(|n| n.to_string())
                .collect();
            FormatterListing {
                name: formatter_type.name().to_string(),
                codes,
                parent: formatter_type.parent().map(|p| p.name().to_string()),
                legacy: notifications.is_empty(),
                notifications,
            }
        })
        .collect()
}

pub fn handle_list(args: &ListArgs, options: &LoaderOptions) -> Result<()> {
    let loader = options.build();
    let formatters = listings(&loader);
    let manifests: Vec<ManifestListing> = ManifestLoader::new(options.load_path.clone())
        .discover()
        .into_iter()
        .map(|m| ManifestListing {
            path: m.require_path,
            file: m.file.display().to_string(),
        })
        .collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "formatters": formatters,
                "manifests": manifests,
            }))?
        );
        return Ok(());
    }

    println!("Formatters:");
    for formatter in &formatters {
        let codes = if formatter.codes.is_empty() {
            String::new()
        } else {
            format!(" ({})", formatter.codes.join(", "))
        };
        println!("  {}{}", formatter.name, codes);
        if formatter.legacy {
            println!("    legacy interface");
        } else {
            println!("    {}", formatter.notifications.join(", "));
        }
    }

    if !manifests.is_empty() {
        println!("\nManifests on the load path:");
        for manifest in &manifests {
            println!("  {} -> {}", manifest.path, manifest.file);
        }
    }

    Ok(())
}
