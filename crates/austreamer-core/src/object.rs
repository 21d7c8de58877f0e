//! String-keyed property bag carried by every element.
//!
//! Properties are declared with a default value, which fixes their type.
//! Later [`Object::set`] calls are checked against that type; integer values
//! are accepted for float properties. Elements read their properties when
//! they move to Ready, so changes made while streaming take effect on the
//! next Idle→Ready.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::PropertyError;

/// A property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(String),
}

impl PropValue {
    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    fn accepts(&self, other: &PropValue) -> bool {
        matches!(
            (self, other),
            (Self::Bool(_), Self::Bool(_))
                | (Self::Int(_), Self::Int(_))
                | (Self::Float(_), Self::Float(_) | Self::Int(_))
                | (Self::Str(_), Self::Str(_))
        )
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for PropValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Named property bag.
#[derive(Clone, Debug, Default)]
pub struct Object {
    name: String,
    props: BTreeMap<String, PropValue>,
}

impl Object {
    /// Creates an object with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: BTreeMap::new(),
        }
    }

    /// Builder form of [`declare`](Self::declare).
    #[must_use]
    pub fn with(mut self, key: &str, default: impl Into<PropValue>) -> Self {
        self.declare(key, default);
        self
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares `key` with its default value, replacing any earlier declaration.
    pub fn declare(&mut self, key: &str, default: impl Into<PropValue>) {
        self.props.insert(key.to_owned(), default.into());
    }

    /// Sets a declared property, checking the value type.
    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) -> Result<(), PropertyError> {
        let value = value.into();
        let slot = self
            .props
            .get_mut(key)
            .ok_or_else(|| PropertyError::Unknown(key.to_owned()))?;
        if !slot.accepts(&value) {
            return Err(PropertyError::TypeMismatch {
                key: key.to_owned(),
                expected: slot.type_name(),
                found: value.type_name(),
            });
        }
        *slot = match (&*slot, value) {
            (PropValue::Float(_), PropValue::Int(i)) => PropValue::Float(i as f64),
            (_, v) => v,
        };
        Ok(())
    }

    /// Raw property value.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// Iterates declared properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn lookup(&self, key: &str) -> Result<&PropValue, PropertyError> {
        self.props
            .get(key)
            .ok_or_else(|| PropertyError::Unknown(key.to_owned()))
    }

    fn mismatch(key: &str, expected: &'static str, found: &PropValue) -> PropertyError {
        PropertyError::TypeMismatch {
            key: key.to_owned(),
            expected,
            found: found.type_name(),
        }
    }

    /// Integer property.
    pub fn get_int(&self, key: &str) -> Result<i64, PropertyError> {
        match self.lookup(key)? {
            PropValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(key, "int", other)),
        }
    }

    /// Integer property narrowed to `u32`.
    pub fn get_u32(&self, key: &str) -> Result<u32, PropertyError> {
        u32::try_from(self.get_int(key)?).map_err(|_| PropertyError::OutOfRange(key.to_owned()))
    }

    /// Integer property narrowed to `usize`.
    pub fn get_usize(&self, key: &str) -> Result<usize, PropertyError> {
        usize::try_from(self.get_int(key)?).map_err(|_| PropertyError::OutOfRange(key.to_owned()))
    }

    /// Float property; integer values are widened.
    pub fn get_float(&self, key: &str) -> Result<f64, PropertyError> {
        match self.lookup(key)? {
            PropValue::Float(v) => Ok(*v),
            PropValue::Int(v) => Ok(*v as f64),
            other => Err(Self::mismatch(key, "float", other)),
        }
    }

    /// Boolean property.
    pub fn get_bool(&self, key: &str) -> Result<bool, PropertyError> {
        match self.lookup(key)? {
            PropValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(key, "bool", other)),
        }
    }

    /// String property.
    pub fn get_str(&self, key: &str) -> Result<&str, PropertyError> {
        match self.lookup(key)? {
            PropValue::Str(v) => Ok(v),
            other => Err(Self::mismatch(key, "string", other)),
        }
    }
}
