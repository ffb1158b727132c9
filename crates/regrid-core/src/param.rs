//! Layered parametrisation.
//!
//! A regridding request is described by key/value parameters coming from
//! three places: the user request, the input field's metadata, and
//! process-wide defaults. Lookups resolve through the layers in that order
//! (request overrides metadata overrides defaults). Individual plan steps
//! can additionally be parametrised with per-call overrides via [`Overlay`].

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

// ── Value ───────────────────────────────────────────────────────

/// A typed parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Long(i64),
    /// Floating-point number.
    Double(f64),
    /// String.
    Str(String),
    /// List of integers.
    LongList(Vec<i64>),
    /// List of floating-point numbers.
    DoubleList(Vec<f64>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::LongList(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
            Self::DoubleList(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::LongList(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleList(v)
    }
}

// ── Parametrisation trait ───────────────────────────────────────

/// Read access to a set of parameters.
///
/// The typed getters return `None` both when the key is absent and when it
/// holds a value of a different type; callers that need to distinguish the
/// two cases use [`get`](Parametrisation::get) directly.
pub trait Parametrisation: Send + Sync {
    /// Look up a value by key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Whether the key is present.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up an integer value.
    fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Value::Long(v)) => Some(v),
            _ => None,
        }
    }

    /// Look up a floating-point value, widening from integer if needed.
    fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(Value::Double(v)) => Some(v),
            Some(Value::Long(v)) => Some(v as f64),
            _ => None,
        }
    }

    /// Look up a boolean value.
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(v)) => Some(v),
            _ => None,
        }
    }

    /// Look up a string value.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::Str(v)) => Some(v),
            _ => None,
        }
    }

    /// Look up a list of floating-point numbers, widening from integers.
    fn get_double_list(&self, key: &str) -> Option<Vec<f64>> {
        match self.get(key) {
            Some(Value::DoubleList(v)) => Some(v),
            Some(Value::LongList(v)) => Some(v.into_iter().map(|x| x as f64).collect()),
            _ => None,
        }
    }
}

// ── ParamMap ────────────────────────────────────────────────────

/// An insertion-ordered parameter map.
///
/// Iteration order is the order keys were first set, which keeps printed
/// requests and plans stable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamMap {
    entries: IndexMap<String, Value>,
}

impl ParamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    /// Remove a key. Returns the previous value, if any.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Parametrisation for ParamMap {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }
}

impl fmt::Display for ParamMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

// ── Overlay ─────────────────────────────────────────────────────

/// Per-call parameter overrides in front of a base parametrisation.
///
/// Built by `ActionPlan::add_with` to parametrise a single step; the
/// overlay is owned by the action built from it, which keeps the override
/// values alive for the action's lifetime.
#[derive(Clone)]
pub struct Overlay {
    overrides: ParamMap,
    base: Arc<dyn Parametrisation>,
}

impl Overlay {
    /// Place `overrides` in front of `base`.
    pub fn new(overrides: ParamMap, base: Arc<dyn Parametrisation>) -> Self {
        Self { overrides, base }
    }
}

impl Parametrisation for Overlay {
    fn get(&self, key: &str) -> Option<Value> {
        self.overrides.get(key).or_else(|| self.base.get(key))
    }
}

// ── Merged ──────────────────────────────────────────────────────

/// The merged parametrisation of one request.
///
/// Three layers: user request, field metadata, process defaults. A lookup
/// returns the first layer that has the key. The individual layers stay
/// accessible because planning needs to distinguish what the *user* asked
/// for from what the *field* already is.
#[derive(Clone)]
pub struct Merged {
    user: Arc<ParamMap>,
    field: Arc<ParamMap>,
    defaults: Arc<ParamMap>,
}

impl Merged {
    /// Combine the three layers.
    pub fn new(user: ParamMap, field: ParamMap, defaults: Arc<ParamMap>) -> Self {
        Self {
            user: Arc::new(user),
            field: Arc::new(field),
            defaults,
        }
    }

    /// The user-request layer.
    pub fn user(&self) -> &ParamMap {
        &self.user
    }

    /// The field-metadata layer.
    pub fn field(&self) -> &ParamMap {
        &self.field
    }

    /// The process-defaults layer.
    pub fn defaults(&self) -> &ParamMap {
        &self.defaults
    }
}

impl Parametrisation for Merged {
    fn get(&self, key: &str) -> Option<Value> {
        self.user
            .get(key)
            .or_else(|| self.field.get(key))
            .or_else(|| self.defaults.get(key))
    }
}
