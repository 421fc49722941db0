//! Tagged value encoding for captured capability state.
//!
//! Every capability serializes its state into a [`SaveValue`]: a small,
//! explicitly-tagged tree. The tag travels with the value (`{"t": ..., "v":
//! ...}` in JSON), so each entry in a save file is self-describing and new
//! variants can be introduced without breaking readers of older files.
//! Accessors are lenient by design: a restorer that finds an unexpected
//! shape gets `None` back and keeps its current state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A captured state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum SaveValue {
    /// Absence of a value, e.g. an empty inventory slot.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A 3-component world position.
    Vec3([f32; 3]),
    List(Vec<SaveValue>),
    Map(BTreeMap<String, SaveValue>),
}

impl SaveValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SaveValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SaveValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SaveValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric accessor; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SaveValue::Float(value) => Some(*value),
            SaveValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|value| value as f32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SaveValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match self {
            SaveValue::Vec3(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SaveValue]> {
        match self {
            SaveValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SaveValue>> {
        match self {
            SaveValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a map value.
    pub fn get(&self, key: &str) -> Option<&SaveValue> {
        self.as_map().and_then(|entries| entries.get(key))
    }
}

impl From<bool> for SaveValue {
    fn from(value: bool) -> Self {
        SaveValue::Bool(value)
    }
}

impl From<i64> for SaveValue {
    fn from(value: i64) -> Self {
        SaveValue::Int(value)
    }
}

impl From<u32> for SaveValue {
    fn from(value: u32) -> Self {
        SaveValue::Int(i64::from(value))
    }
}

impl From<f64> for SaveValue {
    fn from(value: f64) -> Self {
        SaveValue::Float(value)
    }
}

impl From<f32> for SaveValue {
    fn from(value: f32) -> Self {
        SaveValue::Float(f64::from(value))
    }
}

impl From<&str> for SaveValue {
    fn from(value: &str) -> Self {
        SaveValue::Str(value.to_string())
    }
}

impl From<String> for SaveValue {
    fn from(value: String) -> Self {
        SaveValue::Str(value)
    }
}

impl From<[f32; 3]> for SaveValue {
    fn from(value: [f32; 3]) -> Self {
        SaveValue::Vec3(value)
    }
}

impl From<Vec<SaveValue>> for SaveValue {
    fn from(values: Vec<SaveValue>) -> Self {
        SaveValue::List(values)
    }
}

impl From<BTreeMap<String, SaveValue>> for SaveValue {
    fn from(entries: BTreeMap<String, SaveValue>) -> Self {
        SaveValue::Map(entries)
    }
}
