// Type resolver - turns formatter identifiers into formatter types

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::LoaderError;
use crate::formatters::{self, FormatterTypeRef, names};
use crate::report::NotificationRegistry;

/// Built-in short codes; closed, nothing can be added at runtime
const BUILT_IN_CODES: &[(&[&str], &str)] = &[
    (&["d", "doc", "documentation"], names::DOCUMENTATION),
    (&["h", "html"], names::HTML),
    (&["p", "progress"], names::PROGRESS),
    (&["j", "json"], names::JSON),
    (&["f", "failures"], names::FAILURE_LIST),
];

static QUALIFIED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9_:]*$").expect("invalid qualified name regex"));
static ACRONYM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("invalid acronym boundary regex"));
static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("invalid word boundary regex"));
static RSPEC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)r_spec($|/)").expect("invalid rspec segment regex"));

/// Qualified type name of a built-in short code
pub fn built_in_name(code: &str) -> Option<&'static str> {
    BUILT_IN_CODES
        .iter()
        .find(|(codes, _)| codes.contains(&code))
        .map(|(_, name)| *name)
}

/// Every built-in short code with the type it stands for
pub fn built_in_codes() -> impl Iterator<Item = (&'static [&'static str], &'static str)> {
    BUILT_IN_CODES.iter().copied()
}

/// Whether `s` has the lexical shape of a namespaced type name
pub fn is_qualified_name(s: &str) -> bool {
    QUALIFIED_NAME.is_match(s)
}

/// `Foo::BarBaz` -> `foo/bar_baz`
pub fn underscore(name: &str) -> String {
    let word = name.replace("::", "/");
    let word = ACRONYM_BOUNDARY.replace_all(&word, "${1}_${2}");
    let word = WORD_BOUNDARY.replace_all(&word, "${1}_${2}");
    word.replace('-', "_").to_lowercase()
}

/// Conventional load path for a qualified type name.
///
/// `RSpec` is spelled as one word on disk, so a `r_spec` segment becomes `rspec`.
pub fn path_for(name: &str) -> String {
    RSPEC_SEGMENT
        .replace(&underscore(name), "${1}rspec${2}")
        .into_owned()
}

/// How a caller names the formatter it wants
#[derive(Clone)]
pub enum FormatterRef {
    /// Short code or qualified type name
    Name(String),
    /// A type value, used as-is
    Type(FormatterTypeRef),
}

impl From<&str> for FormatterRef {
    fn from(name: &str) -> Self {
        FormatterRef::Name(name.to_string())
    }
}

impl From<String> for FormatterRef {
    fn from(name: String) -> Self {
        FormatterRef::Name(name)
    }
}

impl From<&String> for FormatterRef {
    fn from(name: &String) -> Self {
        FormatterRef::Name(name.clone())
    }
}

impl From<FormatterTypeRef> for FormatterRef {
    fn from(formatter_type: FormatterTypeRef) -> Self {
        FormatterRef::Type(formatter_type)
    }
}

impl From<&FormatterTypeRef> for FormatterRef {
    fn from(formatter_type: &FormatterTypeRef) -> Self {
        FormatterRef::Type(Arc::clone(formatter_type))
    }
}

impl fmt::Display for FormatterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterRef::Name(name) => f.write_str(name),
            FormatterRef::Type(formatter_type) => f.write_str(formatter_type.name()),
        }
    }
}

impl fmt::Debug for FormatterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterRef::Name(name) => write!(f, "FormatterRef::Name({:?})", name),
            FormatterRef::Type(formatter_type) => {
                write!(f, "FormatterRef::Type({})", formatter_type.name())
            }
        }
    }
}

/// The formatter types defined so far, addressable by qualified name
#[derive(Debug, Default, Clone)]
pub struct TypeNamespace {
    types: BTreeMap<String, FormatterTypeRef>,
    modules: BTreeSet<String>,
}

impl TypeNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, creating its enclosing namespaces; redefinition replaces
    pub fn define(&mut self, formatter_type: FormatterTypeRef) {
        let name = formatter_type.name();
        let mut prefix = String::new();
        let components: Vec<&str> = name.split("::").collect();
        for component in &components[..components.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push_str("::");
            }
            prefix.push_str(component);
            self.modules.insert(prefix.clone());
        }
        self.types.insert(name.to_string(), formatter_type);
    }

    /// Walk `qualified` one component at a time; any missing component means no match
    pub fn lookup(&self, qualified: &str) -> Option<FormatterTypeRef> {
        let components: Vec<&str> = qualified.split("::").collect();
        let (last, enclosing) = components.split_last()?;

        let mut prefix = String::new();
        for component in enclosing {
            if component.is_empty() {
                return None;
            }
            if !prefix.is_empty() {
                prefix.push_str("::");
            }
            prefix.push_str(component);
            if !self.modules.contains(&prefix) {
                return None;
            }
        }

        if last.is_empty() {
            return None;
        }
        self.types.get(qualified).cloned()
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.lookup(qualified).is_some()
    }

    pub fn types(&self) -> impl Iterator<Item = &FormatterTypeRef> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// What a [`TypeLoader`] may touch while loading a path
pub struct LoadContext<'a> {
    pub namespace: &'a mut TypeNamespace,
    pub registry: &'a NotificationRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    NotFound,
}

/// Strategy that defines formatter types on demand from a conventional path
pub trait TypeLoader: Send + Sync {
    fn load(&self, path: &str, cx: &mut LoadContext<'_>) -> Result<LoadOutcome>;
}

impl<T: TypeLoader + ?Sized> TypeLoader for Arc<T> {
    fn load(&self, path: &str, cx: &mut LoadContext<'_>) -> Result<LoadOutcome> {
        (**self).load(path, cx)
    }
}

type Definer = Box<dyn Fn(&mut LoadContext<'_>) -> Result<()> + Send + Sync>;

/// In-memory loader: a fixed map from path to the code that defines its types
#[derive(Default)]
pub struct StaticTypeLoader {
    definers: HashMap<String, Definer>,
    attempts: Mutex<Vec<String>>,
}

impl StaticTypeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, path: impl Into<String>, definer: F) -> Self
    where
        F: Fn(&mut LoadContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.definers.insert(path.into(), Box::new(definer));
        self
    }

    /// Every path a load was attempted for, in order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TypeLoader for StaticTypeLoader {
    fn load(&self, path: &str, cx: &mut LoadContext<'_>) -> Result<LoadOutcome> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());

        match self.definers.get(path) {
            Some(definer) => {
                definer(cx)?;
                Ok(LoadOutcome::Loaded)
            }
            None => Ok(LoadOutcome::NotFound),
        }
    }
}

/// Resolves identifiers: short codes, then type values, then qualified names
pub struct TypeResolver {
    namespace: TypeNamespace,
    registry: Arc<NotificationRegistry>,
    loader: Option<Box<dyn TypeLoader>>,
    loaded_paths: HashSet<String>,
}

impl TypeResolver {
    /// Resolver knowing the built-in types, with no dynamic loading
    pub fn new(registry: Arc<NotificationRegistry>) -> Self {
        let mut namespace = TypeNamespace::new();
        formatters::define_builtins(&mut namespace, &registry);
        Self {
            namespace,
            registry,
            loader: None,
            loaded_paths: HashSet::new(),
        }
    }

    pub fn with_loader(mut self, loader: impl TypeLoader + 'static) -> Self {
        self.set_loader(Box::new(loader));
        self
    }

    pub fn set_loader(&mut self, loader: Box<dyn TypeLoader>) {
        self.loader = Some(loader);
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn namespace(&self) -> &TypeNamespace {
        &self.namespace
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    /// Make a host-defined type resolvable by name
    pub fn define(&mut self, formatter_type: FormatterTypeRef) {
        self.namespace.define(formatter_type);
    }

    pub fn resolve(&mut self, identifier: &FormatterRef) -> Result<FormatterTypeRef, LoaderError> {
        let name = match identifier {
            FormatterRef::Type(formatter_type) => return Ok(Arc::clone(formatter_type)),
            FormatterRef::Name(name) => name,
        };

        if let Some(qualified) = built_in_name(name) {
            if let Some(formatter_type) = self.namespace.lookup(qualified) {
                return Ok(formatter_type);
            }
        } else if is_qualified_name(name) {
            return self.resolve_qualified(name);
        }

        Err(LoaderError::UnknownFormatter {
            identifier: name.clone(),
        })
    }

    fn resolve_qualified(&mut self, name: &str) -> Result<FormatterTypeRef, LoaderError> {
        if let Some(formatter_type) = self.namespace.lookup(name) {
            return Ok(formatter_type);
        }

        let path = path_for(name);
        let not_found = || LoaderError::FormatterNotFound {
            identifier: name.to_string(),
            path: path.clone(),
        };

        if !self.require(&path)? {
            return Err(not_found());
        }

        debug!("Retrying lookup of {} after loading {}", name, path);
        self.namespace.lookup(name).ok_or_else(not_found)
    }

    /// Load `path` unless it was loaded before; true only when something new was loaded
    fn require(&mut self, path: &str) -> Result<bool, LoaderError> {
        let Some(loader) = &self.loader else {
            return Ok(false);
        };
        if self.loaded_paths.contains(path) {
            return Ok(false);
        }

        debug!("Loading formatter definitions from {}", path);
        let mut cx = LoadContext {
            namespace: &mut self.namespace,
            registry: &self.registry,
        };

        match loader.load(path, &mut cx) {
            Ok(LoadOutcome::Loaded) => {
                self.loaded_paths.insert(path.to_string());
                Ok(true)
            }
            Ok(LoadOutcome::NotFound) => Ok(false),
            Err(e) => Err(LoaderError::LoadFailed {
                path: path.to_string(),
                source: e.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("Foo::BarBaz"), "foo/bar_baz");
        assert_eq!(underscore("HTMLFormatter"), "html_formatter");
        assert_eq!(underscore("Acme::JUnitXML"), "acme/j_unit_xml");
        assert_eq!(underscore("Step2Report"), "step2_report");
        assert_eq!(underscore("My-Formatter"), "my_formatter");
    }

    #[test]
    fn test_path_for_keeps_rspec_together() {
        assert_eq!(path_for("RSpec::Custom"), "rspec/custom");
        assert_eq!(path_for("Acme::RSpec::Dots"), "acme/rspec/dots");
        assert_eq!(path_for("RSpecish"), "r_specish");
    }

    #[test]
    fn test_qualified_name_shape() {
        assert!(is_qualified_name("Foo"));
        assert!(is_qualified_name("Foo::Bar_2"));
        assert!(!is_qualified_name("foo"));
        assert!(!is_qualified_name("Foo::Bar!"));
        assert!(!is_qualified_name("::Foo"));
        assert!(!is_qualified_name("../Foo"));
        assert!(!is_qualified_name(""));
    }

    #[test]
    fn test_namespace_walk_requires_every_component() {
        let mut namespace = TypeNamespace::new();
        formatters::define_builtins(&mut namespace, &NotificationRegistry::new());

        assert!(namespace.contains(names::PROGRESS));
        assert!(!namespace.contains("Testfmt::Missing::ProgressFormatter"));
        assert!(!namespace.contains("Testfmt::Formatters"));
        assert!(!namespace.contains("Testfmt::::Formatters::ProgressFormatter"));
    }

    #[test]
    fn test_builtin_codes_are_closed() {
        assert_eq!(built_in_name("p"), Some(names::PROGRESS));
        assert_eq!(built_in_name("documentation"), Some(names::DOCUMENTATION));
        assert_eq!(built_in_name("x"), None);
        assert_eq!(built_in_name("Progress"), None);
    }
}
