// Formatters - renderers that observe reporter notifications

pub mod base;
pub mod deprecation;
pub mod documentation;
pub mod external;
pub mod failure_list;
pub mod fallback;
pub mod html;
pub mod json;
pub mod profile;
pub mod progress;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::loader::TypeNamespace;
use crate::report::registry::NotificationRegistry;
use crate::report::{Notification, Payload};
use crate::utils::Output;

pub use base::{BaseFormatter, BaseTextFormatter};
pub use deprecation::DeprecationFormatter;
pub use documentation::DocumentationFormatter;
pub use external::ExternalFormatter;
pub use failure_list::FailureListFormatter;
pub use fallback::FallbackMessageFormatter;
pub use html::HtmlFormatter;
pub use json::JsonFormatter;
pub use profile::ProfileFormatter;
pub use progress::ProgressFormatter;

/// Qualified names of the built-in formatter types
pub mod names {
    pub const BASE: &str = "Testfmt::Formatters::BaseFormatter";
    pub const BASE_TEXT: &str = "Testfmt::Formatters::BaseTextFormatter";
    pub const PROGRESS: &str = "Testfmt::Formatters::ProgressFormatter";
    pub const DOCUMENTATION: &str = "Testfmt::Formatters::DocumentationFormatter";
    pub const HTML: &str = "Testfmt::Formatters::HtmlFormatter";
    pub const JSON: &str = "Testfmt::Formatters::JsonFormatter";
    pub const FAILURE_LIST: &str = "Testfmt::Formatters::FailureListFormatter";
    pub const DEPRECATION: &str = "Testfmt::Formatters::DeprecationFormatter";
    pub const FALLBACK_MESSAGE: &str = "Testfmt::Formatters::FallbackMessageFormatter";
    pub const PROFILE: &str = "Testfmt::Formatters::ProfileFormatter";
}

/// A live formatter instance registered with the reporter
pub trait Formatter: Send + Sync {
    /// Qualified name of the type this instance was built from
    fn type_name(&self) -> &str;

    /// Primary output destination
    fn output(&self) -> &Output;

    /// Handle one notification the formatter subscribed to
    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()>;
}

pub type FormatterTypeRef = Arc<FormatterType>;

/// Builds an instance of a formatter type bound to its outputs
pub type FormatterFactory =
    Arc<dyn Fn(&FormatterType, Vec<Output>) -> Result<Arc<dyn Formatter>> + Send + Sync>;

/// Descriptor of a formatter type: its name, supertype, exposed methods and constructor
pub struct FormatterType {
    name: String,
    parent: Option<FormatterTypeRef>,
    responds_to: BTreeSet<Notification>,
    factory: FormatterFactory,
}

impl FormatterType {
    pub fn builder(name: impl Into<String>) -> FormatterTypeBuilder {
        FormatterTypeBuilder {
            name: name.into(),
            parent: None,
            responds_to: BTreeSet::new(),
        }
    }

    /// Fully qualified name, e.g. `Testfmt::Formatters::ProgressFormatter`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the qualified name
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn parent(&self) -> Option<&FormatterTypeRef> {
        self.parent.as_ref()
    }

    /// This type followed by its supertypes, nearest first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// True if this type or any supertype has the given qualified name
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors().any(|t| t.name == name)
    }

    /// Notification methods exposed by this type, inherited ones included
    pub fn methods(&self) -> BTreeSet<Notification> {
        self.ancestors()
            .flat_map(|t| t.responds_to.iter().copied())
            .collect()
    }

    /// Construct an instance bound to `outputs`
    pub fn instantiate(&self, outputs: Vec<Output>) -> Result<Arc<dyn Formatter>> {
        if outputs.is_empty() {
            anyhow::bail!("{} needs at least one output", self.name);
        }
        (self.factory)(self, outputs)
    }

    pub fn factory(&self) -> FormatterFactory {
        Arc::clone(&self.factory)
    }
}

impl fmt::Debug for FormatterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterType")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

impl fmt::Display for FormatterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for FormatterType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FormatterType {}

pub struct Ancestors<'a> {
    next: Option<&'a FormatterType>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a FormatterType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

pub struct FormatterTypeBuilder {
    name: String,
    parent: Option<FormatterTypeRef>,
    responds_to: BTreeSet<Notification>,
}

impl FormatterTypeBuilder {
    pub fn extends(mut self, parent: &FormatterTypeRef) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn responds_to(mut self, methods: impl IntoIterator<Item = Notification>) -> Self {
        self.responds_to.extend(methods);
        self
    }

    pub fn build<F>(self, factory: F) -> FormatterTypeRef
    where
        F: Fn(&FormatterType, Vec<Output>) -> Result<Arc<dyn Formatter>> + Send + Sync + 'static,
    {
        self.build_with(Arc::new(factory))
    }

    pub fn build_with(self, factory: FormatterFactory) -> FormatterTypeRef {
        Arc::new(FormatterType {
            name: self.name,
            parent: self.parent,
            responds_to: self.responds_to,
            factory,
        })
    }
}

/// Define one type: add it to the namespace and record its subscriptions
fn define(
    namespace: &mut TypeNamespace,
    registry: &NotificationRegistry,
    formatter_type: FormatterTypeRef,
    notifications: &[Notification],
) -> FormatterTypeRef {
    if !registry.contains(formatter_type.name()) {
        registry.register(&formatter_type, notifications.iter().copied());
    }
    namespace.define(Arc::clone(&formatter_type));
    formatter_type
}

/// Define every built-in formatter type.
///
/// Registry entries that already exist are kept, so a shared registry is
/// only written the first time.
pub fn define_builtins(namespace: &mut TypeNamespace, registry: &NotificationRegistry) {
    use Notification as N;

    let base_notifications = [N::START, N::EXAMPLE_GROUP_STARTED, N::CLOSE];
    let base = define(
        namespace,
        registry,
        FormatterType::builder(names::BASE)
            .responds_to(base_notifications)
            .build(|ty, outputs| Ok(Arc::new(BaseFormatter::new(ty.name(), outputs)))),
        &base_notifications,
    );

    let text_notifications = [
        N::MESSAGE,
        N::DUMP_FAILURES,
        N::DUMP_PENDING,
        N::DUMP_SUMMARY,
        N::SEED,
        N::CLOSE,
    ];
    let base_text = define(
        namespace,
        registry,
        FormatterType::builder(names::BASE_TEXT)
            .extends(&base)
            .responds_to(text_notifications)
            .build(|ty, outputs| Ok(Arc::new(BaseTextFormatter::new(ty.name(), outputs)))),
        &text_notifications,
    );

    let progress_notifications = [
        N::EXAMPLE_PASSED,
        N::EXAMPLE_PENDING,
        N::EXAMPLE_FAILED,
        N::START_DUMP,
    ];
    define(
        namespace,
        registry,
        FormatterType::builder(names::PROGRESS)
            .extends(&base_text)
            .responds_to(progress_notifications)
            .build(|ty, outputs| Ok(Arc::new(ProgressFormatter::new(ty.name(), outputs)))),
        &progress_notifications,
    );

    let documentation_notifications = [
        N::EXAMPLE_GROUP_STARTED,
        N::EXAMPLE_GROUP_FINISHED,
        N::EXAMPLE_PASSED,
        N::EXAMPLE_PENDING,
        N::EXAMPLE_FAILED,
    ];
    define(
        namespace,
        registry,
        FormatterType::builder(names::DOCUMENTATION)
            .extends(&base_text)
            .responds_to(documentation_notifications)
            .build(|ty, outputs| Ok(Arc::new(DocumentationFormatter::new(ty.name(), outputs)))),
        &documentation_notifications,
    );

    let html_notifications = [
        N::START,
        N::EXAMPLE_GROUP_STARTED,
        N::EXAMPLE_PASSED,
        N::EXAMPLE_FAILED,
        N::EXAMPLE_PENDING,
        N::DUMP_SUMMARY,
    ];
    define(
        namespace,
        registry,
        FormatterType::builder(names::HTML)
            .extends(&base)
            .responds_to(html_notifications)
            .build(|ty, outputs| Ok(Arc::new(HtmlFormatter::new(ty.name(), outputs)))),
        &html_notifications,
    );

    let json_notifications = [
        N::MESSAGE,
        N::DUMP_SUMMARY,
        N::DUMP_PROFILE,
        N::STOP,
        N::SEED,
        N::CLOSE,
    ];
    define(
        namespace,
        registry,
        FormatterType::builder(names::JSON)
            .extends(&base)
            .responds_to(json_notifications)
            .build(|ty, outputs| Ok(Arc::new(JsonFormatter::new(ty.name(), outputs)))),
        &json_notifications,
    );

    let failure_list_notifications = [N::EXAMPLE_FAILED, N::MESSAGE];
    define(
        namespace,
        registry,
        FormatterType::builder(names::FAILURE_LIST)
            .extends(&base)
            .responds_to(failure_list_notifications)
            .build(|ty, outputs| Ok(Arc::new(FailureListFormatter::new(ty.name(), outputs)))),
        &failure_list_notifications,
    );

    let deprecation_notifications = [N::DEPRECATION, N::DEPRECATION_SUMMARY];
    define(
        namespace,
        registry,
        FormatterType::builder(names::DEPRECATION)
            .responds_to(deprecation_notifications)
            .build(|ty, outputs| Ok(Arc::new(DeprecationFormatter::new(ty.name(), outputs)))),
        &deprecation_notifications,
    );

    define(
        namespace,
        registry,
        FormatterType::builder(names::FALLBACK_MESSAGE)
            .responds_to([N::MESSAGE])
            .build(|ty, outputs| {
                Ok(Arc::new(FallbackMessageFormatter::new(ty.name(), outputs)))
            }),
        &[N::MESSAGE],
    );

    define(
        namespace,
        registry,
        FormatterType::builder(names::PROFILE)
            .responds_to([N::DUMP_PROFILE])
            .build(|ty, outputs| Ok(Arc::new(ProfileFormatter::new(ty.name(), outputs)))),
        &[N::DUMP_PROFILE],
    );
}

/// Split materialized outputs into the primary one and the rest
pub(crate) fn split_outputs(outputs: Vec<Output>) -> (Output, Vec<Output>) {
    let mut iter = outputs.into_iter();
    let primary = iter.next().unwrap_or(Output::Stdout);
    (primary, iter.collect())
}
