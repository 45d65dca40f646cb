//! Processor parameters.

use serde::{Deserialize, Serialize};
use std::mem;
use thiserror::Error;

/// Typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    FloatList(Vec<f64>),
    String(String),
    IVec2([i32; 2]),
    Vec3([f64; 3]),
    /// Selected key of a fixed option list.
    Option(String),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "Bool",
            PropertyValue::Int(_) => "Int",
            PropertyValue::Float(_) => "Float",
            PropertyValue::FloatList(_) => "FloatList",
            PropertyValue::String(_) => "String",
            PropertyValue::IVec2(_) => "IVec2",
            PropertyValue::Vec3(_) => "Vec3",
            PropertyValue::Option(_) => "Option",
        }
    }

    pub fn same_type(&self, other: &PropertyValue) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) | PropertyValue::Option(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ivec2(&self) -> Option<[i32; 2]> {
        match self {
            PropertyValue::IVec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            PropertyValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// How much work a property change causes on its processor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum InvalidationLevel {
    #[default]
    Valid,
    /// Re-run `process`.
    InvalidOutput,
    /// Rebuild resources (shaders, kernels), then `process`.
    InvalidResources,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Property {property} holds {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Property {0} is read-only")]
    ReadOnly(String),

    #[error("Property {property} has no option {value:?}")]
    InvalidOption { property: String, value: String },
}

/// A named, typed processor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    identifier: String,
    display_name: String,
    value: PropertyValue,
    default: PropertyValue,
    invalidation: InvalidationLevel,
    read_only: bool,
    range: Option<(f64, f64)>,
    options: Vec<String>,
}

impl Property {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            default: value.clone(),
            value,
            invalidation: InvalidationLevel::InvalidOutput,
            read_only: false,
            range: None,
            options: Vec::new(),
        }
    }

    pub fn with_invalidation(mut self, level: InvalidationLevel) -> Self {
        self.invalidation = level;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Clamp numeric values (Int, Float, FloatList, IVec2, Vec3) into `[min, max]`.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self.value = self.clamped(self.value.clone());
        self.default = self.value.clone();
        self
    }

    /// Restrict an `Option` property to the given keys.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn default_value(&self) -> &PropertyValue {
        &self.default
    }

    pub fn invalidation_level(&self) -> InvalidationLevel {
        self.invalidation
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Assign a new value. Returns whether the stored value changed.
    pub fn set(&mut self, value: PropertyValue) -> Result<bool, PropertyError> {
        if self.read_only {
            return Err(PropertyError::ReadOnly(self.identifier.clone()));
        }
        self.assign(value)
    }

    /// Assign bypassing the read-only flag. Used by the owning processor.
    pub(crate) fn assign(&mut self, value: PropertyValue) -> Result<bool, PropertyError> {
        if !self.value.same_type(&value) {
            return Err(PropertyError::TypeMismatch {
                property: self.identifier.clone(),
                expected: self.value.type_name(),
                found: value.type_name(),
            });
        }
        if let PropertyValue::Option(key) = &value {
            if !self.options.is_empty() && !self.options.contains(key) {
                return Err(PropertyError::InvalidOption {
                    property: self.identifier.clone(),
                    value: key.clone(),
                });
            }
        }
        let value = self.clamped(value);
        if value == self.value {
            return Ok(false);
        }
        self.value = value;
        Ok(true)
    }

    /// Restore the default value. Returns whether the value changed.
    pub fn reset(&mut self) -> bool {
        if self.value == self.default {
            return false;
        }
        self.value = self.default.clone();
        true
    }

    fn clamped(&self, value: PropertyValue) -> PropertyValue {
        let Some((min, max)) = self.range else {
            return value;
        };
        let clamp = |x: f64| x.clamp(min, max);
        match value {
            PropertyValue::Int(v) => PropertyValue::Int(clamp(v as f64) as i64),
            PropertyValue::Float(v) => PropertyValue::Float(clamp(v)),
            PropertyValue::FloatList(v) => {
                PropertyValue::FloatList(v.into_iter().map(clamp).collect())
            }
            PropertyValue::IVec2(v) => PropertyValue::IVec2(v.map(|x| clamp(x as f64) as i32)),
            PropertyValue::Vec3(v) => PropertyValue::Vec3(v.map(clamp)),
            other => other,
        }
    }
}

/// Ordered properties of one processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyCollection {
    properties: Vec<Property>,
}

impl PropertyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property. A property with the same identifier is replaced.
    pub fn add(&mut self, property: Property) {
        match self.index_of(property.identifier()) {
            Some(i) => {
                tracing::warn!("Property {} declared twice", property.identifier());
                self.properties[i] = property;
            }
            None => self.properties.push(property),
        }
    }

    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.identifier() == identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.identifier() == identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.identifier() == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl FromIterator<Property> for PropertyCollection {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        let mut collection = PropertyCollection::new();
        for property in iter {
            collection.add(property);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change() {
        let mut p = Property::new("factor", "Factor", PropertyValue::Float(1.0));
        assert_eq!(p.set(PropertyValue::Float(2.0)), Ok(true));
        assert_eq!(p.set(PropertyValue::Float(2.0)), Ok(false));
        assert!(p.reset());
        assert_eq!(p.value(), &PropertyValue::Float(1.0));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut p = Property::new("factor", "Factor", PropertyValue::Float(1.0));
        let err = p.set(PropertyValue::Int(3)).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        assert_eq!(p.value(), &PropertyValue::Float(1.0));
    }

    #[test]
    fn test_range_clamps() {
        let mut p =
            Property::new("size", "Size", PropertyValue::IVec2([8, 8])).with_range(1.0, 16.0);
        p.set(PropertyValue::IVec2([0, 100])).unwrap();
        assert_eq!(p.value(), &PropertyValue::IVec2([1, 16]));
    }

    #[test]
    fn test_options_checked() {
        let mut p = Property::new("backend", "Backend", PropertyValue::Option("ram".into()))
            .with_options(["ram", "device"]);
        assert!(p.set(PropertyValue::Option("device".into())).unwrap());
        assert!(matches!(
            p.set(PropertyValue::Option("gpu".into())),
            Err(PropertyError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_read_only() {
        let mut p = Property::new("count", "Count", PropertyValue::Int(0)).read_only();
        assert_eq!(
            p.set(PropertyValue::Int(1)),
            Err(PropertyError::ReadOnly("count".into()))
        );
        assert_eq!(p.assign(PropertyValue::Int(1)), Ok(true));
    }

    #[test]
    fn test_value_serde_tagged() {
        let json = serde_json::to_string(&PropertyValue::Vec3([1.0, 0.5, 0.0])).unwrap();
        assert_eq!(json, r#"{"type":"Vec3","value":[1.0,0.5,0.0]}"#);
    }

    #[test]
    fn test_collection_replaces_duplicate() {
        let collection: PropertyCollection = [
            Property::new("a", "A", PropertyValue::Bool(false)),
            Property::new("a", "A", PropertyValue::Bool(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("a").unwrap().value(), &PropertyValue::Bool(true));
    }
}
