//! # Dynamic values carried by watchers, context, and memo.
//!
//! The runtime moves loosely typed data between the managed function, the
//! reactive subsystem, and the control surface. [`Value`] is the sum type
//! that carries it: primitives, byte strings, structural containers, and an
//! escape hatch for user types ([`Value::Opaque`]).
//!
//! ## Rules
//! - Equality is structural deep-equal per variant. `Float` compares by IEEE
//!   `==` (`NaN != NaN`). Opaque values compare through
//!   [`OpaqueValue::opaque_eq`].
//! - [`Value::deep_clone`] produces a fully isolated copy: containers recurse,
//!   opaque values clone through [`OpaqueValue::clone_opaque`]. Primitives
//!   short-circuit (their `Clone` already owns).
//! - The plain `Clone` impl shares `Opaque` handles (`Arc` clone); use
//!   `deep_clone` wherever isolation matters (atomic context updates).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// User-defined payload stored inside [`Value::Opaque`].
///
/// Requiring the clone and equality hooks up front is what lets
/// `UpdateValue`-style deep copies and change detection work uniformly over
/// every variant; a type that cannot provide them cannot enter the store.
pub trait OpaqueValue: fmt::Debug + Send + Sync + 'static {
    /// Produces an isolated copy of the payload.
    fn clone_opaque(&self) -> Arc<dyn OpaqueValue>;

    /// Structural equality against another opaque payload.
    ///
    /// Implementations should downcast `other` via [`OpaqueValue::as_any`]
    /// and return `false` on type mismatch.
    fn opaque_eq(&self, other: &dyn OpaqueValue) -> bool;

    /// Downcast support for [`OpaqueValue::opaque_eq`] implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Dynamic value: the currency of watchers, context, and memo.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absent/none.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// IEEE 754 double.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<Value>),
    /// String-keyed map (ordered for stable projections).
    Map(BTreeMap<String, Value>),
    /// User-defined payload with registered clone/equality hooks.
    Opaque(Arc<dyn OpaqueValue>),
}

impl Value {
    /// Short stable label for the variant (logs, projections).
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Opaque(_) => "opaque",
        }
    }

    /// True for variants whose `Clone` is already an isolated copy.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_)
        )
    }

    /// Produces a fully isolated copy.
    ///
    /// Containers recurse; `Opaque` clones through its registered hook;
    /// primitives and owned scalars short-circuit to `Clone`.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::deep_clone).collect()),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect(),
            ),
            Value::Opaque(payload) => Value::Opaque(payload.clone_opaque()),
            other => other.clone(),
        }
    }

    /// Projects the value into JSON for the control surface.
    ///
    /// `Bytes` render as a length marker, `Opaque` as an opaque marker; both
    /// are lossy: the HTTP surface is observability, not transport.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Opaque(_) => serde_json::Value::String("<opaque>".to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.opaque_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
