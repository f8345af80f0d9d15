// Loader module - resolves formatters and wires them into the reporter for one run

pub mod error;
pub mod legacy;
pub mod manifest;
pub mod resolver;

use std::collections::BTreeSet;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::formatters::{Formatter, FormatterTypeRef, names};
use crate::report::{
    DeprecationNotice, Notification, NotificationRegistry, RegistrySnapshot, Reporter,
};
use crate::utils::{Destination, FsOpener, Output, OutputOpener};

pub use error::LoaderError;
pub use legacy::{LegacyAdapter, LegacyFormatter, ProbeAdapter};
pub use manifest::{DiscoveredManifest, FormatterManifest, ManifestLoader};
pub use resolver::{
    FormatterRef, LoadContext, LoadOutcome, StaticTypeLoader, TypeLoader, TypeNamespace,
    TypeResolver, path_for,
};

/// Identifier added when nothing else was configured
pub const DEFAULT_FORMATTER: &str = "progress";

/// Where an `add` came from, for deprecation diagnostics
#[derive(Debug, Clone, Copy)]
pub enum CallSite {
    Code(&'static Location<'static>),
    Configuration,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Code(location) => write!(f, "Formatter added at: {}", location),
            CallSite::Configuration => write!(f, "Formatter added via configuration"),
        }
    }
}

/// Whether a formatter type can take part in the run, and how
#[derive(Debug)]
pub enum Eligibility {
    /// Registered notifications somewhere in its ancestry
    Eligible {
        formatter_type: FormatterTypeRef,
        subscriptions: BTreeSet<Notification>,
    },
    /// Unregistered, but a legacy adapter is available
    NeedsAdapter { formatter_type: FormatterTypeRef },
    /// Unregistered and nothing can adapt it
    Ineligible { formatter_type: FormatterTypeRef },
}

/// A formatter taking part in the run, with the type it was built from
#[derive(Clone)]
pub struct ActiveFormatter {
    formatter_type: FormatterTypeRef,
    formatter: Arc<dyn Formatter>,
    outputs: Vec<Output>,
}

impl ActiveFormatter {
    pub fn formatter_type(&self) -> &FormatterTypeRef {
        &self.formatter_type
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// Every output the formatter was bound to, primary first
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    fn duplicates(&self, formatter: &dyn Formatter) -> bool {
        self.formatter.type_name() == formatter.type_name()
            && self.formatter.output().is_same_destination(formatter.output())
    }
}

impl fmt::Debug for ActiveFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveFormatter")
            .field("formatter_type", &self.formatter_type.name())
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Owns the active formatters of one run and registers them with its reporter
pub struct Loader {
    reporter: Reporter,
    formatters: Vec<ActiveFormatter>,
    resolver: TypeResolver,
    registry: Arc<NotificationRegistry>,
    opener: Box<dyn OutputOpener>,
    legacy_adapter: Option<Arc<dyn LegacyAdapter>>,
    default_formatter: String,
}

impl Loader {
    /// Loader backed by the process-wide notification registry
    pub fn new(reporter: Reporter) -> Self {
        Self::with_registry(reporter, NotificationRegistry::global())
    }

    /// Loader reading a frozen copy of a registry, for hosts that define
    /// formatter types while other runs are in flight
    pub fn from_snapshot(reporter: Reporter, snapshot: RegistrySnapshot) -> Self {
        Self::with_registry(reporter, Arc::new(NotificationRegistry::from(snapshot)))
    }

    pub fn with_registry(reporter: Reporter, registry: Arc<NotificationRegistry>) -> Self {
        Self {
            reporter,
            formatters: Vec::new(),
            resolver: TypeResolver::new(Arc::clone(&registry)),
            registry,
            opener: Box::new(FsOpener),
            legacy_adapter: None,
            default_formatter: DEFAULT_FORMATTER.to_string(),
        }
    }

    /// Enable on-demand loading of unknown qualified names
    pub fn with_type_loader(mut self, loader: impl TypeLoader + 'static) -> Self {
        self.resolver.set_loader(Box::new(loader));
        self
    }

    pub fn with_legacy_adapter(mut self, adapter: Arc<dyn LegacyAdapter>) -> Self {
        self.legacy_adapter = Some(adapter);
        self
    }

    pub fn with_output_opener(mut self, opener: impl OutputOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Active formatters, in the order they were added
    pub fn formatters(&self) -> &[ActiveFormatter] {
        &self.formatters
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    pub fn into_reporter(self) -> Reporter {
        self.reporter
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut TypeResolver {
        &mut self.resolver
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    pub fn default_formatter(&self) -> &str {
        &self.default_formatter
    }

    pub fn set_default_formatter(&mut self, identifier: impl Into<String>) {
        self.default_formatter = identifier.into();
    }

    pub fn has_legacy_adapter(&self) -> bool {
        self.legacy_adapter.is_some()
    }

    /// Also emit `dump_profile` and make sure something renders it
    pub fn set_profile_examples(&mut self, enabled: bool) {
        self.reporter.set_profile_examples(enabled);
    }

    pub fn resolve(
        &mut self,
        identifier: impl Into<FormatterRef>,
    ) -> Result<FormatterTypeRef, LoaderError> {
        self.resolver.resolve(&identifier.into())
    }

    /// Union of the notifications registered by `formatter_type` and its supertypes
    pub fn subscriptions_for(&self, formatter_type: &FormatterTypeRef) -> BTreeSet<Notification> {
        self.registry.subscriptions_for(formatter_type)
    }

    pub fn eligibility(&self, formatter_type: &FormatterTypeRef) -> Eligibility {
        let subscriptions = self.subscriptions_for(formatter_type);
        let formatter_type = Arc::clone(formatter_type);

        if !subscriptions.is_empty() {
            Eligibility::Eligible {
                formatter_type,
                subscriptions,
            }
        } else if self.legacy_adapter.is_some() {
            Eligibility::NeedsAdapter { formatter_type }
        } else {
            Eligibility::Ineligible { formatter_type }
        }
    }

    /// Resolve `identifier`, bind it to `destinations` and register it with the reporter.
    ///
    /// Returns `Ok(None)` only when the type uses the legacy interface and no
    /// adapter is available. If a formatter of the same type already writes to
    /// the same output, that active instance is returned instead.
    #[track_caller]
    pub fn add<I, D>(
        &mut self,
        identifier: I,
        destinations: D,
    ) -> Result<Option<Arc<dyn Formatter>>, LoaderError>
    where
        I: Into<FormatterRef>,
        D: IntoIterator,
        D::Item: Into<Destination>,
    {
        let call_site = CallSite::Code(Location::caller());
        self.add_at(identifier.into(), collect(destinations), call_site)
    }

    /// Like [`Loader::add`], for formatters named in a config file or on the command line
    pub fn add_from_config<I, D>(
        &mut self,
        identifier: I,
        destinations: D,
    ) -> Result<Option<Arc<dyn Formatter>>, LoaderError>
    where
        I: Into<FormatterRef>,
        D: IntoIterator,
        D::Item: Into<Destination>,
    {
        self.add_at(
            identifier.into(),
            collect(destinations),
            CallSite::Configuration,
        )
    }

    /// Register a formatter of `formatter_type` that was already constructed
    pub fn add_instance(
        &mut self,
        formatter_type: &FormatterTypeRef,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Arc<dyn Formatter>, LoaderError> {
        let subscriptions = self.subscriptions_for(formatter_type);
        if subscriptions.is_empty() {
            return Err(LoaderError::UnregisteredInstance {
                formatter: formatter_type.name().to_string(),
            });
        }

        let outputs = vec![formatter.output().clone()];
        Ok(self.register(Arc::clone(formatter_type), formatter, outputs, subscriptions))
    }

    fn add_at(
        &mut self,
        identifier: FormatterRef,
        destinations: Vec<Destination>,
        call_site: CallSite,
    ) -> Result<Option<Arc<dyn Formatter>>, LoaderError> {
        let formatter_type = self.resolver.resolve(&identifier)?;
        debug!("Resolved formatter '{}' to {}", identifier, formatter_type);

        let outputs = destinations
            .into_iter()
            .map(|d| self.materialize(d))
            .collect::<Result<Vec<_>, _>>()?;

        match self.eligibility(&formatter_type) {
            Eligibility::Eligible {
                formatter_type,
                subscriptions,
            } => {
                let formatter = formatter_type
                    .instantiate(outputs.clone())
                    .map_err(|e| LoaderError::construct(formatter_type.name(), e))?;
                Ok(Some(self.register(
                    formatter_type,
                    formatter,
                    outputs,
                    subscriptions,
                )))
            }
            Eligibility::NeedsAdapter { formatter_type } => {
                let Some(adapter) = self.legacy_adapter.clone() else {
                    return Ok(None);
                };
                let adapted = adapter
                    .load_formatter(&formatter_type, outputs.clone())
                    .map_err(|e| LoaderError::construct(formatter_type.name(), e))?;
                info!("Adapted legacy formatter {}", formatter_type);
                Ok(Some(self.register(
                    formatter_type,
                    adapted.formatter,
                    outputs,
                    adapted.notifications,
                )))
            }
            Eligibility::Ineligible { formatter_type } => {
                self.warn_legacy_formatter(&formatter_type, call_site);
                Ok(None)
            }
        }
    }

    /// Make sure a run has a formatter and a place for deprecations to go
    pub fn setup_defaults(
        &mut self,
        output: impl Into<Destination>,
        deprecation_output: impl Into<Destination>,
    ) -> Result<(), LoaderError> {
        let output = self.materialize(output.into())?;

        if self.formatters.is_empty() {
            let default = self.default_formatter.clone();
            self.add_from_config(default, [output.clone()])?;
        }

        if !self.any_formatter_is_a(names::DEPRECATION) {
            let deprecation_output = self.materialize(deprecation_output.into())?;
            self.add_from_config(names::DEPRECATION, [deprecation_output, output.clone()])?;
        }

        if !self.existing_formatter_implements(Notification::MESSAGE) {
            self.add_from_config(names::FALLBACK_MESSAGE, [output.clone()])?;
        }

        if self.reporter.profile_examples()
            && !self.existing_formatter_implements(Notification::DUMP_PROFILE)
        {
            self.add_from_config(names::PROFILE, [output])?;
        }

        Ok(())
    }

    fn materialize(&self, destination: Destination) -> Result<Output, LoaderError> {
        match destination {
            Destination::Sink(output) => Ok(output),
            Destination::Path(path) => self
                .opener
                .open(&path)
                .map_err(|source| LoaderError::Output { path, source }),
        }
    }

    fn register(
        &mut self,
        formatter_type: FormatterTypeRef,
        formatter: Arc<dyn Formatter>,
        outputs: Vec<Output>,
        notifications: BTreeSet<Notification>,
    ) -> Arc<dyn Formatter> {
        if let Some(existing) = self.duplicate_of(formatter.as_ref()) {
            debug!(
                "Skipping duplicate {} writing to {}",
                formatter.type_name(),
                formatter.output()
            );
            return Arc::clone(existing.formatter());
        }

        info!(
            "Registered {} ({} notifications) writing to {}",
            formatter.type_name(),
            notifications.len(),
            formatter.output()
        );
        self.reporter
            .register_listener(Arc::clone(&formatter), notifications);
        self.formatters.push(ActiveFormatter {
            formatter_type,
            formatter: Arc::clone(&formatter),
            outputs,
        });
        formatter
    }

    fn duplicate_of(&self, formatter: &dyn Formatter) -> Option<&ActiveFormatter> {
        self.formatters
            .iter()
            .find(|active| active.duplicates(formatter))
    }

    fn any_formatter_is_a(&self, type_name: &str) -> bool {
        self.formatters
            .iter()
            .any(|active| active.formatter_type.is_a(type_name))
    }

    fn existing_formatter_implements(&self, notification: Notification) -> bool {
        !self.reporter.registered_listeners(notification).is_empty()
    }

    fn warn_legacy_formatter(&mut self, formatter_type: &FormatterTypeRef, call_site: CallSite) {
        let message = format!(
            "The {} formatter uses the deprecated formatter interface not supported directly \
             by testfmt. To continue to use this formatter you must enable the legacy \
             formatter adapter (--legacy-formatters), which provides support for legacy \
             formatters, or upgrade the formatter to a compatible version.",
            formatter_type
        );
        warn!("{} {}", message, call_site);
        self.reporter
            .deprecation(DeprecationNotice::new(message).with_call_site(call_site.to_string()));
    }
}

fn collect<D>(destinations: D) -> Vec<Destination>
where
    D: IntoIterator,
    D::Item: Into<Destination>,
{
    destinations.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> Loader {
        Loader::with_registry(Reporter::new(), Arc::new(NotificationRegistry::new()))
    }

    #[test]
    fn test_call_site_display() {
        assert_eq!(
            CallSite::Configuration.to_string(),
            "Formatter added via configuration"
        );
        let here = CallSite::Code(Location::caller());
        assert!(here.to_string().starts_with("Formatter added at: "));
    }

    #[test]
    fn test_builtins_are_eligible() {
        let mut loader = loader();
        let progress = loader.resolve("progress").unwrap();

        match loader.eligibility(&progress) {
            Eligibility::Eligible { subscriptions, .. } => {
                assert!(subscriptions.contains(&Notification::EXAMPLE_PASSED));
                assert!(subscriptions.contains(&Notification::MESSAGE));
                assert!(subscriptions.contains(&Notification::START));
            }
            other => panic!("expected eligible, got {:?}", other),
        }
    }

    #[test]
    fn test_add_returns_registered_instance() {
        let mut loader = loader();
        let (output, _) = Output::buffer();

        let formatter = loader.add("doc", [output]).unwrap().unwrap();

        assert_eq!(formatter.type_name(), names::DOCUMENTATION);
        assert_eq!(loader.formatters().len(), 1);
        assert_eq!(
            loader
                .reporter()
                .registered_listeners(Notification::EXAMPLE_GROUP_FINISHED)
                .len(),
            1
        );
    }
}
