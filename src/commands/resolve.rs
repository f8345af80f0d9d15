// Resolve command - show what an identifier turns into

use anyhow::Result;
use serde::Serialize;

use crate::cli::ResolveArgs;
use crate::loader::{Eligibility, Loader, path_for};

use super::LoaderOptions;

#[derive(Debug, Serialize)]
pub struct Resolution {
    pub identifier: String,
    pub name: String,
    pub ancestry: Vec<String>,
    pub path: String,
    pub notifications: Vec<String>,
    pub eligibility: &'static str,
}

pub fn resolve(loader: &mut Loader, identifier: &str) -> Result<Resolution> {
    let formatter_type = loader.resolve(identifier)?;
    let eligibility = match loader.eligibility(&formatter_type) {
        Eligibility::Eligible { .. } => "eligible",
        Eligibility::NeedsAdapter { .. } => "legacy (adapted)",
        Eligibility::Ineligible { .. } => "legacy (skipped)",
    };

    Ok(Resolution {
        identifier: identifier.to_string(),
        name: formatter_type.name().to_string(),
        ancestry: formatter_type
            .ancestors()
            .map(|t| t.name().to_string())
            .collect(),
        path: path_for(formatter_type.name()),
        notifications: loader
            .subscriptions_for(&formatter_type)
            .into_iter()
            .map(|n| n.to_string())
            .collect(),
        eligibility,
    })
}

pub fn handle_resolve(args: &ResolveArgs, options: &LoaderOptions) -> Result<()> {
    let mut loader = options.build();
    let resolution = resolve(&mut loader, &args.identifier)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    println!("{} -> {}", resolution.identifier, resolution.name);
    println!("  ancestry:      {}", resolution.ancestry.join(" < "));
    println!("  load path:     {}", resolution.path);
    println!("  notifications: {}", resolution.notifications.join(", "));
    println!("  status:        {}", resolution.eligibility);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::names;

    #[test]
    fn test_resolve_short_code() {
        let mut loader = LoaderOptions::default().build();

        let resolution = resolve(&mut loader, "d").unwrap();

        assert_eq!(resolution.name, names::DOCUMENTATION);
        assert_eq!(
            resolution.ancestry,
            vec![names::DOCUMENTATION, names::BASE_TEXT, names::BASE]
        );
        assert_eq!(resolution.eligibility, "eligible");
        assert_eq!(resolution.path, "testfmt/formatters/documentation_formatter");
    }

    #[test]
    fn test_unknown_identifier_fails() {
        let mut loader = LoaderOptions::default().build();

        let err = resolve(&mut loader, "fancy").err().unwrap();

        assert!(err.to_string().contains("maybe you meant"));
    }
}
