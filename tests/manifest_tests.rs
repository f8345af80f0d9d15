// Tests for manifest-defined external formatters - public API only

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use testfmt::formatters::names;
use testfmt::loader::{Loader, LoaderError, ManifestLoader};
use testfmt::report::{Notification, NotificationRegistry, Reporter};
use testfmt::state::TestResult;
use testfmt::utils::Output;

const DOTS_MANIFEST: &str = r#"
[[formatter]]
name = "Acme::DotsFormatter"
extends = "Testfmt::Formatters::BaseFormatter"
notifications = ["example_passed"]
command = "bin/dots.sh"
description = "Prints a tick per passing example"

[[formatter]]
name = "Acme::OldFormatter"
responds_to = ["message"]
command = "bin/dots.sh"
"#;

fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("acme/bin")).unwrap();
    fs::write(root.join("acme/dots_formatter.toml"), DOTS_MANIFEST).unwrap();
    fs::write(root.join("acme/old_formatter.toml"), DOTS_MANIFEST).unwrap();

    let script = root.join("acme/bin/dots.sh");
    fs::write(&script, "#!/bin/sh\ncat > /dev/null\necho tick\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

fn loader_for(root: &Path) -> Loader {
    Loader::with_registry(Reporter::new(), Arc::new(NotificationRegistry::new()))
        .with_type_loader(ManifestLoader::new([root.to_path_buf()]))
}

#[test]
fn test_manifest_type_is_loaded_by_derived_path() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let mut loader = loader_for(temp_dir.path());

    // Act
    let formatter_type = loader.resolve("Acme::DotsFormatter").unwrap();

    // Assert
    assert_eq!(formatter_type.name(), "Acme::DotsFormatter");
    assert!(formatter_type.is_a(names::BASE));
    let subscriptions = loader.subscriptions_for(&formatter_type);
    // BaseFormatter's notifications are inherited
    assert!(subscriptions.contains(&Notification::EXAMPLE_PASSED));
    assert!(subscriptions.contains(&Notification::START));
}

#[cfg(unix)]
#[test]
fn test_external_formatter_writes_command_output() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let mut loader = loader_for(temp_dir.path());
    let (output, buffer) = Output::buffer();
    loader.add("Acme::DotsFormatter", [output]).unwrap();

    // Act
    loader
        .reporter_mut()
        .example_finished(TestResult::pass("adds", 1));

    // Assert
    assert_eq!(buffer.contents(), "tick\n");
}

#[test]
fn test_manifest_without_notifications_defines_legacy_type() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let mut loader = loader_for(temp_dir.path());

    // Act
    let added = loader.add("Acme::OldFormatter", [Output::Stdout]).unwrap();

    // Assert
    assert!(added.is_none());
    assert_eq!(loader.reporter().pending_deprecations().len(), 1);
}

#[test]
fn test_name_missing_from_its_manifest_is_not_found() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    fs::write(
        temp_dir.path().join("acme/other_formatter.toml"),
        "[[formatter]]\nname = \"Acme::Unrelated\"\ncommand = \"x\"\nnotifications = [\"close\"]\n",
    )
    .unwrap();
    let mut loader = loader_for(temp_dir.path());

    // Act
    let err = loader.resolve("Acme::OtherFormatter").err().unwrap();

    // Assert
    assert!(matches!(err, LoaderError::FormatterNotFound { .. }));
    assert!(loader.resolver().namespace().contains("Acme::Unrelated"));
}

#[test]
fn test_invalid_manifest_fails_to_load() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(temp_dir.path().join("acme")).unwrap();
    fs::write(
        temp_dir.path().join("acme/broken.toml"),
        "[[formatter]]\nname = \"Acme::Broken\"\ncommand = \"x\"\nnotifications = [\"explode\"]\n",
    )
    .unwrap();
    let mut loader = loader_for(temp_dir.path());

    // Act
    let err = loader.resolve("Acme::Broken").err().unwrap();

    // Assert
    assert!(matches!(err, LoaderError::LoadFailed { ref path, .. } if path == "acme/broken"));
}

#[test]
fn test_discover_lists_manifests() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());

    // Act
    let found = ManifestLoader::new([temp_dir.path().to_path_buf()]).discover();

    // Assert
    let paths: Vec<&str> = found.iter().map(|m| m.require_path.as_str()).collect();
    assert_eq!(paths, vec!["acme/dots_formatter", "acme/old_formatter"]);
}

#[test]
fn test_failed_manifest_defines_none_of_its_entries() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(temp_dir.path().join("acme")).unwrap();
    fs::write(
        temp_dir.path().join("acme/mixed.toml"),
        "[[formatter]]\nname = \"Acme::Mixed\"\ncommand = \"x\"\nnotifications = [\"close\"]\n\n\
         [[formatter]]\nname = \"Acme::Broken\"\ncommand = \"x\"\nnotifications = [\"explode\"]\n",
    )
    .unwrap();
    let mut loader = loader_for(temp_dir.path());

    // Act
    let err = loader.resolve("Acme::Mixed").err().unwrap();

    // Assert
    assert!(matches!(err, LoaderError::LoadFailed { .. }));
    assert!(!loader.resolver().namespace().contains("Acme::Mixed"));
    assert!(!loader.registry().contains("Acme::Mixed"));
}

#[test]
fn test_entry_may_extend_an_earlier_entry_of_the_same_manifest() {
    // Arrange
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(temp_dir.path().join("acme")).unwrap();
    fs::write(
        temp_dir.path().join("acme/fancy_dots.toml"),
        "[[formatter]]\nname = \"Acme::PlainDots\"\ncommand = \"x\"\nnotifications = [\"close\"]\n\n\
         [[formatter]]\nname = \"Acme::FancyDots\"\nextends = \"Acme::PlainDots\"\ncommand = \"x\"\nnotifications = [\"example_passed\"]\n",
    )
    .unwrap();
    let mut loader = loader_for(temp_dir.path());

    // Act
    let formatter_type = loader.resolve("Acme::FancyDots").unwrap();

    // Assert
    assert!(formatter_type.is_a("Acme::PlainDots"));
    assert!(
        loader
            .subscriptions_for(&formatter_type)
            .contains(&Notification::CLOSE)
    );
}
