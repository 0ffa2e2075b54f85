// ── Parameter trees and response bindings ──
//
// Resource parameters are declared as a typed tree whose leaves may be
// deferred references into an upstream resource's creation response.
// Resolution happens in a single pass over the sorted plan, against the
// outputs of resources that already completed in the current run.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

// ── FieldPath ───────────────────────────────────────────────────────

/// Dotted path into a JSON response (`keyPair.PrivateKey`, `Role.Arn`).
///
/// Numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Borrow the value at this path, if present.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments().try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Remove and return the value at this path, if present.
    pub fn take(&self, root: &mut Value) -> Option<Value> {
        let (parent, leaf) = match self.0.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, self.0.as_str()),
        };
        let container = match parent {
            Some(parent) => FieldPath::new(parent).lookup_mut(root)?,
            None => root,
        };
        container.as_object_mut()?.remove(leaf)
    }

    fn lookup_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        self.segments().try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ── ResponseBinding ─────────────────────────────────────────────────

/// Deferred reference to a field of another resource's creation response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseBinding {
    pub resource: String,
    pub field: FieldPath,
}

impl ResponseBinding {
    pub fn new(resource: impl Into<String>, field: impl Into<FieldPath>) -> Self {
        Self {
            resource: resource.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for ResponseBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.field)
    }
}

/// Shorthand for [`ResponseBinding::new`] wrapped as a parameter leaf.
pub fn bind(resource: &str, field: &str) -> ParamValue {
    ParamValue::Binding(ResponseBinding::new(resource, field))
}

// ── Resolution ──────────────────────────────────────────────────────

/// Which rendering of sensitive response fields a resolution wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Sensitive values are replaced by their digests. Used for change
    /// detection; never leaves the process in plaintext form.
    Fingerprint,
    /// Sensitive values are exposed. Only used to build the outgoing call.
    Payload,
}

/// Source of resolved binding values (the outputs of the current run).
pub trait BindingSource {
    fn resolve_binding(
        &self,
        requester: &str,
        binding: &ResponseBinding,
        view: View,
    ) -> Result<Value, CoreError>;
}

// ── ParamValue ──────────────────────────────────────────────────────

/// One piece of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Binding(ResponseBinding),
}

/// A parameter tree whose leaves may be response bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
    /// The value of an upstream response field, verbatim.
    Binding(ResponseBinding),
    /// A string assembled from literals and response fields.
    Template(Vec<TemplatePart>),
    /// The inner tree, resolved and then encoded as a JSON string.
    Json(Box<ParamValue>),
}

impl ParamValue {
    /// Build a map parameter from `(key, value)` pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ParamValue)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = ParamValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Wrap `inner` so it resolves to its JSON encoding.
    pub fn json(inner: ParamValue) -> Self {
        Self::Json(Box::new(inner))
    }

    /// Every binding in this tree, depth-first.
    pub fn bindings(&self) -> Vec<&ResponseBinding> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a ResponseBinding>) {
        match self {
            Self::Binding(b) => out.push(b),
            Self::Template(parts) => out.extend(parts.iter().filter_map(|p| match p {
                TemplatePart::Binding(b) => Some(b),
                TemplatePart::Literal(_) => None,
            })),
            Self::List(items) => items.iter().for_each(|i| i.collect_bindings(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_bindings(out)),
            Self::Json(inner) => inner.collect_bindings(out),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    /// Resolve every binding and produce plain JSON.
    pub fn resolve(
        &self,
        requester: &str,
        source: &dyn BindingSource,
        view: View,
    ) -> Result<Value, CoreError> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(
                items
                    .iter()
                    .map(|i| i.resolve(requester, source, view))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.resolve(requester, source, view)?);
                }
                Value::Object(map)
            }
            Self::Binding(b) => source.resolve_binding(requester, b, view)?,
            Self::Template(parts) => {
                let mut rendered = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(s) => rendered.push_str(s),
                        TemplatePart::Binding(b) => {
                            let value = source.resolve_binding(requester, b, view)?;
                            rendered.push_str(&scalar_to_string(requester, b, &value)?);
                        }
                    }
                }
                Value::String(rendered)
            }
            Self::Json(inner) => {
                let value = inner.resolve(requester, source, view)?;
                Value::String(value.to_string())
            }
        })
    }
}

fn scalar_to_string(
    requester: &str,
    binding: &ResponseBinding,
    value: &Value,
) -> Result<String, CoreError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CoreError::ValidationFailed {
            message: format!(
                "'{requester}' interpolates {binding} into a string, but it is not a scalar"
            ),
        }),
    }
}

// ── Conversions ─────────────────────────────────────────────────────

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<ResponseBinding> for ParamValue {
    fn from(b: ResponseBinding) -> Self {
        Self::Binding(b)
    }
}

// ── Canonical encoding ──────────────────────────────────────────────

/// JSON with object keys sorted at every level, for stable digests.
pub fn canonical_json(value: &Value) -> String {
    fn write(value: &Value, out: &mut String) {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String(key.clone()).to_string());
                    out.push(':');
                    if let Some(v) = map.get(key) {
                        write(v, out);
                    }
                }
                out.push('}');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write(item, out);
                }
                out.push(']');
            }
            scalar => out.push_str(&scalar.to_string()),
        }
    }

    let mut out = String::new();
    write(value, &mut out);
    out
}
