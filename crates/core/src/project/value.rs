//! Untyped value tree of an OpenStep-style property list
//!
//! `project.pbxproj` only ever contains three shapes: strings, arrays and
//! dictionaries. Numbers are stored as strings, exactly as they appear in
//! the file, so that writing a parsed file back never changes it.

use indexmap::IndexMap;

/// Ordered dictionary; key order is preserved through a parse/write cycle.
pub type Dict = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}

/// Build a [`Dict`] from `key => value` pairs, keeping the given order.
#[macro_export]
macro_rules! pbx_dict {
    () => { $crate::project::Dict::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::project::Dict::new();
        $(dict.insert($key.to_string(), $crate::project::Value::from($value));)+
        dict
    }};
}
