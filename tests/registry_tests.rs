// Tests for the notification registry - public API only

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use testfmt::formatters::{BaseFormatter, FormatterType, names};
use testfmt::report::{Notification, NotificationRegistry};

fn base_type(name: &str) -> testfmt::formatters::FormatterTypeRef {
    FormatterType::builder(name)
        .build(|ty, outputs| Ok(Arc::new(BaseFormatter::new(ty.name(), outputs))))
}

#[test]
fn test_reregistration_overwrites() {
    // Arrange
    let registry = NotificationRegistry::new();
    let formatter_type = base_type("Acme::Dots");
    registry.register(&formatter_type, [Notification::START, Notification::CLOSE]);

    // Act
    registry.register(&formatter_type, [Notification::MESSAGE]);

    // Assert
    assert_eq!(
        registry.entry("Acme::Dots"),
        Some(BTreeSet::from([Notification::MESSAGE]))
    );
}

#[test]
fn test_unregistered_type_has_no_subscriptions() {
    // Arrange
    let registry = NotificationRegistry::new();
    let formatter_type = base_type("Acme::Legacy");

    // Act
    let subscriptions = registry.subscriptions_for(&formatter_type);

    // Assert
    assert!(subscriptions.is_empty());
    assert!(!registry.contains("Acme::Legacy"));
}

#[test]
fn test_three_level_ancestry_union() {
    // Arrange
    let registry = NotificationRegistry::new();
    let grandparent = base_type("Acme::Base");
    let parent = FormatterType::builder("Acme::Text")
        .extends(&grandparent)
        .build(|ty, outputs| Ok(Arc::new(BaseFormatter::new(ty.name(), outputs))));
    let child = FormatterType::builder("Acme::Dots")
        .extends(&parent)
        .build(|ty, outputs| Ok(Arc::new(BaseFormatter::new(ty.name(), outputs))));
    registry.register(&grandparent, [Notification::START]);
    registry.register(&child, [Notification::EXAMPLE_PASSED]);

    // Act
    let subscriptions = registry.subscriptions_for(&child);

    // Assert
    assert_eq!(
        subscriptions,
        BTreeSet::from([Notification::START, Notification::EXAMPLE_PASSED])
    );
}

#[test]
fn test_snapshot_is_frozen() {
    // Arrange
    let registry = NotificationRegistry::new();
    let formatter_type = base_type("Acme::Dots");
    registry.register(&formatter_type, [Notification::START]);

    // Act
    let snapshot = registry.snapshot();
    registry.register_name("Acme::Later", [Notification::CLOSE]);

    // Assert
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.entry("Acme::Later").is_none());
    assert_eq!(
        snapshot.subscriptions_for(&formatter_type),
        BTreeSet::from([Notification::START])
    );
}

#[test]
fn test_concurrent_readers_see_registered_entries() {
    // Arrange
    let registry = Arc::new(NotificationRegistry::new());
    registry.register_name("Acme::Dots", [Notification::EXAMPLE_PASSED]);

    // Act
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.contains("Acme::Dots"))
        })
        .collect();

    // Assert
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_global_registry_knows_builtins() {
    // Arrange & Act
    let registry = NotificationRegistry::global();

    // Assert
    let progress = registry.entry(names::PROGRESS).unwrap();
    assert!(progress.contains(&Notification::START_DUMP));
    assert!(registry.contains(names::DEPRECATION));
    assert!(Arc::ptr_eq(&registry, &NotificationRegistry::global()));
}
