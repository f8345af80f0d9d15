// Notification registry - which notifications each formatter type declared interest in

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use super::Notification;
use crate::formatters::{self, FormatterType};
use crate::loader::TypeNamespace;

static GLOBAL: Lazy<Arc<NotificationRegistry>> = Lazy::new(|| {
    let registry = NotificationRegistry::new();
    formatters::define_builtins(&mut TypeNamespace::new(), &registry);
    Arc::new(registry)
});

/// Append-only map from formatter type name to its declared notifications.
///
/// Types register once, when they are defined. A run only reads it. Hosts
/// that define formatter types while runs are in flight should hand each run
/// a [`RegistrySnapshot`].
#[derive(Debug, Default)]
pub struct NotificationRegistry {
    entries: RwLock<HashMap<String, BTreeSet<Notification>>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, built-in types already registered
    pub fn global() -> Arc<NotificationRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Record the notifications `formatter_type` wants; overwrites an earlier entry
    pub fn register(
        &self,
        formatter_type: &FormatterType,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        self.register_name(formatter_type.name(), notifications);
    }

    pub fn register_name(
        &self,
        name: impl Into<String>,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        let name = name.into();
        let notifications: BTreeSet<Notification> = notifications.into_iter().collect();
        debug!("Registering {} for {} notification(s)", name, notifications.len());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, notifications);
    }

    /// The entry recorded for exactly this type name
    pub fn entry(&self, name: &str) -> Option<BTreeSet<Notification>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Union of the entries of `formatter_type` and all of its supertypes
    pub fn subscriptions_for(&self, formatter_type: &FormatterType) -> BTreeSet<Notification> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        union_over_ancestry(&entries, formatter_type)
    }

    /// Frozen copy for readers that must not observe later registrations
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

impl From<RegistrySnapshot> for NotificationRegistry {
    /// Registry seeded from a frozen copy; later writes stay local to it
    fn from(snapshot: RegistrySnapshot) -> Self {
        Self {
            entries: RwLock::new(snapshot.entries),
        }
    }
}

/// Read-only copy of a [`NotificationRegistry`]
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    entries: HashMap<String, BTreeSet<Notification>>,
}

impl RegistrySnapshot {
    pub fn entry(&self, name: &str) -> Option<&BTreeSet<Notification>> {
        self.entries.get(name)
    }

    pub fn subscriptions_for(&self, formatter_type: &FormatterType) -> BTreeSet<Notification> {
        union_over_ancestry(&self.entries, formatter_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn union_over_ancestry(
    entries: &HashMap<String, BTreeSet<Notification>>,
    formatter_type: &FormatterType,
) -> BTreeSet<Notification> {
    formatter_type
        .ancestors()
        .filter_map(|t| entries.get(t.name()))
        .flatten()
        .copied()
        .collect()
}
