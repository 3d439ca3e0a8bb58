//! Localized string lookup.
//!
//! Lookups search, in order: bundles registered for the caller types of the
//! build (innermost caller first, each in registration order), bundles passed
//! to the build call, global bundles, and finally built-in English defaults.
//! The first hit wins.
//!
//! A miss never fails: the key itself is returned (or `#key#` in mark-invalid
//! mode), a warning is logged and [`ResourceResolver::on_missing_key`] fires.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;

use horizon_forge_core::Signal;

use crate::error::BuildError;

/// Built-in English strings for dialogs and validation.
pub const DEFAULT_STRINGS: &[(&str, &str)] = &[
    ("button.ok", "OK"),
    ("button.cancel", "Cancel"),
    ("button.yes", "Yes"),
    ("button.no", "No"),
    ("title.confirmation", "Confirmation"),
    ("question.confirm", "Are you sure?"),
    ("title.validationErrors", "Validation Errors"),
    ("label.processing", "Processing..."),
    ("label.cancelling", "Cancelling..."),
    ("validation.mandatory", "{0} is required"),
    ("validation.minLength", "{0} must be at least {1} characters long"),
    ("validation.maxLength", "{0} must be at most {1} characters long"),
    ("validation.regex", "{0} is not in the expected format"),
    ("validation.minValue", "{0} must be at least {1}"),
    ("validation.maxValue", "{0} must be at most {1}"),
    ("validation.numeric", "{0} must be a number"),
    ("validation.dateFormat", "{0} must be a date in the format {1}"),
    ("validation.emailAddress", "{0} must be a valid e-mail address"),
];

/// A named key to string table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBundle {
    name: String,
    entries: IndexMap<String, String>,
}

impl ResourceBundle {
    /// Create an empty bundle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Create a bundle from key/value pairs.
    pub fn from_pairs<K, V, I>(name: impl Into<String>, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            name: name.into(),
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Load a bundle from a TOML document.
    ///
    /// Nested tables flatten into dotted keys, so `[button] ok = "OK"` defines
    /// `button.ok`. Non-string scalars are stored in their TOML text form.
    pub fn from_toml_str(name: impl Into<String>, text: &str) -> Result<Self, BuildError> {
        let name = name.into();
        let table: toml::Table = text.parse().map_err(|source| BuildError::InvalidBundle {
            bundle: name.clone(),
            source,
        })?;
        let mut bundle = Self::new(name);
        flatten_toml(&mut bundle.entries, "", &table);
        Ok(bundle)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// The bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten_toml(entries: &mut IndexMap<String, String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten_toml(entries, &full, nested),
            toml::Value::String(s) => {
                entries.insert(full, s.clone());
            }
            other => {
                entries.insert(full, other.to_string());
            }
        }
    }
}

/// Substitute `{0}`, `{1}`, ... placeholders.
///
/// Placeholders without a matching argument are left untouched.
pub fn format_message(template: &str, args: &[&dyn fmt::Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg.to_string(), close))
        });
        match replaced {
            Some((text, close)) => {
                out.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Scoped lookup of localized strings.
pub struct ResourceResolver {
    class_bundles: RwLock<IndexMap<String, Vec<Arc<ResourceBundle>>>>,
    global_bundles: RwLock<Vec<Arc<ResourceBundle>>>,
    defaults: ResourceBundle,
    mark_invalid: AtomicBool,
    missing_key: Signal<String>,
}

impl ResourceResolver {
    /// Create a resolver holding only the built-in defaults.
    pub fn new() -> Self {
        Self {
            class_bundles: RwLock::new(IndexMap::new()),
            global_bundles: RwLock::new(Vec::new()),
            defaults: ResourceBundle::from_pairs("defaults", DEFAULT_STRINGS.iter().copied()),
            mark_invalid: AtomicBool::new(false),
            missing_key: Signal::new(),
        }
    }

    /// Add a bundle searched for builds whose caller chain contains `caller_type`.
    pub fn add_class_bundle(&self, caller_type: impl Into<String>, bundle: ResourceBundle) {
        self.class_bundles
            .write()
            .entry(caller_type.into())
            .or_default()
            .push(Arc::new(bundle));
    }

    /// Add a bundle searched by every build.
    pub fn add_global_bundle(&self, bundle: ResourceBundle) {
        self.global_bundles.write().push(Arc::new(bundle));
    }

    /// Wrap missing keys in `#` instead of returning them bare.
    pub fn set_mark_invalid(&self, mark: bool) {
        self.mark_invalid.store(mark, Ordering::Release);
    }

    /// Whether missing keys are wrapped in `#`.
    pub fn is_mark_invalid(&self) -> bool {
        self.mark_invalid.load(Ordering::Acquire)
    }

    /// Signal emitted with the key on every lookup miss.
    pub fn on_missing_key(&self) -> &Signal<String> {
        &self.missing_key
    }

    /// Look up `key` without reporting a miss.
    pub fn find(&self, key: &str, class_scope: &[&str], extra: &[Arc<ResourceBundle>]) -> Option<String> {
        {
            let class_bundles = self.class_bundles.read();
            for caller_type in class_scope {
                let hit = class_bundles
                    .get(*caller_type)
                    .into_iter()
                    .flatten()
                    .find_map(|bundle| bundle.get(key));
                if let Some(value) = hit {
                    return Some(value.to_string());
                }
            }
        }

        if let Some(value) = extra.iter().find_map(|bundle| bundle.get(key)) {
            return Some(value.to_string());
        }

        let global = self.global_bundles.read();
        global
            .iter()
            .find_map(|bundle| bundle.get(key))
            .or_else(|| self.defaults.get(key))
            .map(str::to_string)
    }

    /// Look up `key`; a miss returns the key (or `#key#`) and is reported.
    pub fn lookup(&self, key: &str, class_scope: &[&str], extra: &[Arc<ResourceBundle>]) -> String {
        if let Some(value) = self.find(key, class_scope, extra) {
            return value;
        }

        tracing::warn!(target: "horizon_forge::resource", key, "missing resource key");
        self.missing_key.emit(key.to_string());

        if self.is_mark_invalid() {
            format!("#{key}#")
        } else {
            key.to_string()
        }
    }
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("class_scopes", &self.class_bundles.read().keys().collect::<Vec<_>>())
            .field("global_bundles", &self.global_bundles.read().len())
            .field("mark_invalid", &self.is_mark_invalid())
            .finish()
    }
}

/// A resolver bound to one build's caller chain and extra bundles.
#[derive(Clone)]
pub struct ResourceScope {
    resolver: Arc<ResourceResolver>,
    class_scope: Vec<String>,
    extra: Vec<Arc<ResourceBundle>>,
}

impl ResourceScope {
    /// Bind `resolver` to caller type names (innermost first) and extra bundles.
    pub fn new(
        resolver: Arc<ResourceResolver>,
        class_scope: Vec<String>,
        extra: Vec<Arc<ResourceBundle>>,
    ) -> Self {
        Self {
            resolver,
            class_scope,
            extra,
        }
    }

    fn scope(&self) -> Vec<&str> {
        self.class_scope.iter().map(String::as_str).collect()
    }

    /// Look up `key` in this scope.
    pub fn lookup(&self, key: &str) -> String {
        self.resolver.lookup(key, &self.scope(), &self.extra)
    }

    /// Look up `key` without reporting a miss.
    pub fn find(&self, key: &str) -> Option<String> {
        self.resolver.find(key, &self.scope(), &self.extra)
    }

    /// Resolve `text` if it is a known key, otherwise use it literally.
    pub fn resolve_or_literal(&self, text: &str) -> String {
        self.find(text).unwrap_or_else(|| text.to_string())
    }

    /// Look up `key` and substitute placeholders.
    pub fn format(&self, key: &str, args: &[&dyn fmt::Display]) -> String {
        format_message(&self.lookup(key), args)
    }
}

impl fmt::Debug for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceScope")
            .field("class_scope", &self.class_scope)
            .field("extra", &self.extra.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceResolver: Send, Sync);
