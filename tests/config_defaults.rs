use testfmt::config::Config;
use testfmt::loader::DEFAULT_FORMATTER;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert_eq!(config.formatters.default, DEFAULT_FORMATTER);
    assert!(!config.formatters.legacy_formatters);
    assert!(config.formatters.load_path.is_empty());
    assert!(!config.formatters.profile_examples);
    assert!(config.formatters.color);
    assert_eq!(config.formatters.deprecation_output, "stderr");
    assert!(config.formatters.format.is_empty());
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = Config::parse("").expect("Failed to parse empty config");

    assert_eq!(config.formatters.default, "progress");
    assert!(config.formatters.color);
}

#[test]
fn test_generated_config_round_trips() {
    let mut config = Config::default();
    config.formatters.default = "doc".to_string();

    let parsed = Config::parse(&config.to_toml()).expect("Failed to parse generated config");

    assert_eq!(parsed.formatters.default, "doc");
    assert_eq!(parsed.formatters.deprecation_output, "stderr");
}

#[test]
fn test_load_from_file() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(".testfmtrc.toml");
    std::fs::write(
        &path,
        "[formatters]\nlegacy_formatters = true\n\n[[formatters.format]]\nname = \"json\"\noutput = \"out.json\"\n",
    )
    .unwrap();

    let config = Config::load_from_file(&path).expect("Failed to load config");

    assert!(config.formatters.legacy_formatters);
    assert_eq!(config.formatters.format[0].name, "json");
    assert_eq!(config.formatters.format[0].output.as_deref(), Some("out.json"));
}
