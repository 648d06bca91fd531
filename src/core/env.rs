//! # Layered Environment
//!
//! A chain of key/value layers. Every layer owns its own pairs and holds a link to
//! exactly one parent (none for the root). Reads walk from the current layer towards
//! the root and return the first hit; writes only ever touch the current layer.
//!
//! Layers are cheap handles (`Rc<RefCell<..>>`): cloning an [`Env`] clones the handle,
//! while [`Env::clone_layer`] produces an independent copy of the current layer that
//! still shares its parent with the original.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt,
    rc::Rc,
};
use thiserror::Error;

/// The scope kind of one layer in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvLayerType {
    /// Built-in and configured defaults. The root of every chain.
    Default,
    /// Values saved between runs.
    Persisted,
    /// Values living for one session.
    Session,
    /// Values scoped to one command invocation.
    Cmd,
    /// Values scoped to one expanded sub-flow.
    SubFlow,
    /// Scratch values, e.g. while rendering a template.
    Tmp,
}

impl EnvLayerType {
    /// Returns the lowercase display name of the layer kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Persisted => "persisted",
            Self::Session => "session",
            Self::Cmd => "cmd",
            Self::SubFlow => "subflow",
            Self::Tmp => "tmp",
        }
    }
}

impl fmt::Display for EnvLayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single environment value and where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVal {
    /// The raw string value.
    pub raw: String,
    /// The value came from a command-line argument instead of a static binding.
    pub is_arg: bool,
    /// The value came from a system argument (an argument every command accepts).
    pub is_sys_arg: bool,
}

impl EnvVal {
    /// Creates a plain (non-argument) value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }
}

/// Errors raised while reading typed values or looking up layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// No layer of the requested kind exists in the chain.
    #[error("No environment layer of type '{0}' in the current chain.")]
    LayerNotFound(String),
    /// A value could not be read as a boolean.
    #[error("Value '{value}' of key '{key}' is not a boolean.")]
    NotABool {
        /// The key that was read.
        key: String,
        /// The offending value.
        value: String,
    },
    /// A value could not be read as an integer.
    #[error("Value '{value}' of key '{key}' is not an integer.")]
    NotAnInt {
        /// The key that was read.
        key: String,
        /// The offending value.
        value: String,
    },
}

#[derive(Debug)]
struct Layer {
    kind: EnvLayerType,
    pairs: HashMap<String, EnvVal>,
    parent: Option<Env>,
}

/// A handle to one layer of a layered environment.
#[derive(Debug, Clone)]
pub struct Env {
    inner: Rc<RefCell<Layer>>,
}

impl Env {
    /// Creates a new root layer.
    pub fn new(kind: EnvLayerType) -> Self {
        Self::with_parent(kind, None)
    }

    fn with_parent(kind: EnvLayerType, parent: Option<Env>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Layer {
                kind,
                pairs: HashMap::new(),
                parent,
            })),
        }
    }

    /// Creates an empty child layer on top of this one.
    pub fn new_layer(&self, kind: EnvLayerType) -> Self {
        Self::with_parent(kind, Some(self.clone()))
    }

    /// Stacks several child layers, in order, and returns the innermost one.
    pub fn new_layers(&self, kinds: &[EnvLayerType]) -> Self {
        kinds
            .iter()
            .fold(self.clone(), |env, kind| env.new_layer(*kind))
    }

    /// The kind of the current layer.
    pub fn layer_type(&self) -> EnvLayerType {
        self.inner.borrow().kind
    }

    /// The parent layer, if any.
    pub fn parent(&self) -> Option<Env> {
        self.inner.borrow().parent.clone()
    }

    /// Looks a key up, walking towards the root. Returns an empty value if absent.
    pub fn get(&self, key: &str) -> EnvVal {
        self.lookup(key).unwrap_or_default()
    }

    fn lookup(&self, key: &str) -> Option<EnvVal> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let layer = env.inner.borrow();
            if let Some(val) = layer.pairs.get(key) {
                return Some(val.clone());
            }
            current = layer.parent.clone();
        }
        None
    }

    /// Shortcut for `get(key).raw`.
    pub fn get_raw(&self, key: &str) -> String {
        self.get(key).raw
    }

    /// True if any layer in the chain holds the key.
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Reads a boolean. Absent or empty values read as `false`.
    pub fn get_bool(&self, key: &str) -> Result<bool, EnvError> {
        let raw = self.get_raw(key);
        match raw.trim().to_lowercase().as_str() {
            "" | "false" | "off" | "no" | "n" | "0" => Ok(false),
            "true" | "on" | "yes" | "y" | "1" => Ok(true),
            _ => Err(EnvError::NotABool {
                key: key.to_string(),
                value: raw,
            }),
        }
    }

    /// Reads an integer. Absent or empty values read as `0`.
    pub fn get_int(&self, key: &str) -> Result<i64, EnvError> {
        let raw = self.get_raw(key);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed.parse::<i64>().map_err(|_| EnvError::NotAnInt {
            key: key.to_string(),
            value: raw.clone(),
        })
    }

    /// Writes a plain value into the current layer.
    pub fn set(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.set_val(key, EnvVal::new(raw));
    }

    /// Writes a value that came from a command-line argument.
    pub fn set_arg(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.set_val(
            key,
            EnvVal {
                raw: raw.into(),
                is_arg: true,
                is_sys_arg: false,
            },
        );
    }

    /// Writes a value that came from a system argument.
    pub fn set_sys_arg(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.set_val(
            key,
            EnvVal {
                raw: raw.into(),
                is_arg: true,
                is_sys_arg: true,
            },
        );
    }

    /// Writes a boolean as `true`/`false`.
    pub fn set_bool(&self, key: impl Into<String>, value: bool) {
        self.set(key, if value { "true" } else { "false" });
    }

    /// Writes a full value into the current layer.
    pub fn set_val(&self, key: impl Into<String>, val: EnvVal) {
        self.inner.borrow_mut().pairs.insert(key.into(), val);
    }

    /// Removes a key from the current layer and from every ancestor.
    pub fn delete(&self, key: &str) {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let mut layer = env.inner.borrow_mut();
            layer.pairs.remove(key);
            current = layer.parent.clone();
        }
    }

    /// Removes a key from the current layer only, so lookups fall back to the parent.
    pub fn delete_in_self_layer(&self, key: &str) {
        self.inner.borrow_mut().pairs.remove(key);
    }

    /// Deep-copies the current layer's own pairs. The parent is shared, not copied.
    pub fn clone_layer(&self) -> Self {
        let layer = self.inner.borrow();
        Self {
            inner: Rc::new(RefCell::new(Layer {
                kind: layer.kind,
                pairs: layer.pairs.clone(),
                parent: layer.parent.clone(),
            })),
        }
    }

    /// Copies all of `other`'s own pairs into the current layer, overwriting on collision.
    pub fn merge(&self, other: &Env) {
        let incoming = other.inner.borrow().pairs.clone();
        self.inner.borrow_mut().pairs.extend(incoming);
    }

    /// The current layer's own pairs, sorted by key.
    pub fn pairs(&self) -> Vec<(String, EnvVal)> {
        let mut pairs: Vec<_> = self
            .inner
            .borrow()
            .pairs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    /// Flattens the chain into plain pairs. Layers closer to the current one win.
    ///
    /// * `include_default_layer` - apply the `Default` layer's pairs too.
    /// * `excluded_prefixes` - drop keys starting with any of these prefixes.
    /// * `exclude_args` - drop values that came from arguments.
    pub fn flatten(
        &self,
        include_default_layer: bool,
        excluded_prefixes: &[&str],
        exclude_args: bool,
    ) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            current = env.parent();
            chain.push(env);
        }

        let mut flat = BTreeMap::new();
        for env in chain.iter().rev() {
            let layer = env.inner.borrow();
            if !include_default_layer && layer.kind == EnvLayerType::Default {
                continue;
            }
            for (key, val) in &layer.pairs {
                if exclude_args && val.is_arg {
                    continue;
                }
                if excluded_prefixes.iter().any(|p| key.starts_with(p)) {
                    continue;
                }
                flat.insert(key.clone(), val.raw.clone());
            }
        }
        flat
    }

    /// Finds the closest layer of the given kind, starting with the current one.
    pub fn get_layer(&self, kind: EnvLayerType) -> Result<Env, EnvError> {
        self.get_one_of_layers(&[kind])
    }

    /// Finds the closest layer whose kind is any of `kinds`.
    pub fn get_one_of_layers(&self, kinds: &[EnvLayerType]) -> Result<Env, EnvError> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if kinds.contains(&env.layer_type()) {
                return Ok(env);
            }
            current = env.parent();
        }
        Err(EnvError::LayerNotFound(
            kinds
                .iter()
                .map(EnvLayerType::as_str)
                .collect::<Vec<_>>()
                .join("|"),
        ))
    }

    /// Drops own pairs whose value is identical to what the parent chain already yields.
    pub fn deduplicate(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        let redundant: Vec<String> = self
            .inner
            .borrow()
            .pairs
            .iter()
            .filter(|(key, val)| parent.lookup(key).is_some_and(|p| p.raw == val.raw))
            .map(|(key, _)| key.clone())
            .collect();
        let mut layer = self.inner.borrow_mut();
        for key in redundant {
            layer.pairs.remove(&key);
        }
    }
}

/// True for keys whose values must not be displayed, like `db.password` or `api.token`.
pub fn is_sensitive_key(key: &str) -> bool {
    let last = key.rsplit('.').next().unwrap_or(key).to_lowercase();
    matches!(
        last.as_str(),
        "pwd" | "passwd" | "password" | "secret" | "token" | "key"
    ) || last.ends_with("password")
        || last.ends_with("secret")
        || last.ends_with("token")
}
