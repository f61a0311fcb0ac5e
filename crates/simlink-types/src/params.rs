//! Open parameter payloads carried by actions.
//!
//! Actions are schema-free on the wire: any string key may map to any
//! scalar, list, or nested map. [`ParamValue`] models that open shape and
//! adds one variant JSON lacks, [`NdArray`], for values produced by a
//! numeric library (a shaped, typed buffer). Those values are not directly
//! serializable by the simulation process and are flattened into plain
//! numbers and lists by [`ParamValue::to_plain`] before they leave the
//! bridge.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// An open, ordered mapping of parameter names to values.
pub type Params = BTreeMap<String, ParamValue>;

/// A single number: an element of an [`NdArray`] buffer, or a typed
/// numeric action field. Integers stay integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Integer element (`int32`, `int64`, ...).
    Int(i64),
    /// Floating point element (`float32`, `float64`, ...).
    Float(f64),
}

impl Scalar {
    /// Convert to a plain JSON value.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_value(self) -> Value {
        match self {
            Self::Int(v) => Value::Number(Number::from(v)),
            Self::Float(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        }
    }

    /// Widen to `f64`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

/// The element count of a shape does not match the buffer length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shape {shape:?} needs {expected} elements, buffer has {actual}")]
pub struct ShapeError {
    /// The requested shape.
    pub shape: Vec<usize>,
    /// Elements implied by the shape, saturating at `usize::MAX`.
    pub expected: usize,
    /// Elements actually supplied.
    pub actual: usize,
}

/// A numeric-library wrapped value: a shaped buffer of scalars.
///
/// A shape of `[]` is a zero-dimensional wrapped scalar (one element).
/// Elements are stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<Scalar>,
}

impl NdArray {
    /// Wrap a single value as a zero-dimensional array.
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value.into()],
        }
    }

    /// Build a one-dimensional array.
    pub fn vector<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        let data: Vec<Scalar> = values.into_iter().map(Into::into).collect();
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Build an array of arbitrary shape from a row-major buffer.
    pub fn from_shape(shape: Vec<usize>, data: Vec<Scalar>) -> Result<Self, ShapeError> {
        let expected = shape
            .iter()
            .fold(1_usize, |acc, &dim| acc.saturating_mul(dim));
        if expected != data.len() {
            return Err(ShapeError {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// The array's shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Whether this is a zero-dimensional wrapped scalar.
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// The wrapped value, if this is a zero-dimensional array.
    pub fn as_scalar(&self) -> Option<Scalar> {
        if self.is_scalar() {
            self.data.first().copied()
        } else {
            None
        }
    }

    /// Flatten into plain JSON: a bare number for zero-dimensional arrays,
    /// nested lists following the shape otherwise.
    pub fn to_plain(&self) -> Value {
        nest(&self.shape, &self.data)
    }
}

fn nest(shape: &[usize], data: &[Scalar]) -> Value {
    match shape.split_first() {
        None => data.first().map_or(Value::Null, |s| s.to_value()),
        Some((_, [])) => Value::Array(data.iter().map(|s| s.to_value()).collect()),
        Some((&len, rest)) => {
            let stride: usize = rest.iter().product();
            let items = (0..len)
                .map(|i| {
                    let start = i.saturating_mul(stride);
                    let chunk = data
                        .get(start..start.saturating_add(stride))
                        .unwrap_or_default();
                    nest(rest, chunk)
                })
                .collect();
            Value::Array(items)
        }
    }
}

/// One value in an open parameter payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A plain number.
    Number(Number),
    /// A string.
    String(String),
    /// A list of values.
    List(Vec<ParamValue>),
    /// A nested mapping.
    Map(Params),
    /// A numeric-library wrapped scalar or array.
    Array(NdArray),
}

impl ParamValue {
    /// Coerce into directly serializable JSON, flattening every
    /// [`NdArray`] found at any depth.
    pub fn to_plain(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_plain).collect()),
            Self::Map(map) => Value::Object(params_to_plain(map)),
            Self::Array(array) => array.to_plain(),
        }
    }

    /// Read as `f64`, accepting plain numbers and wrapped scalars.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Array(array) => array.as_scalar().map(Scalar::as_f64),
            _ => None,
        }
    }

    /// Read as a [`Scalar`], keeping integers as integers. Accepts plain
    /// numbers and wrapped scalars.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Self::Array(array) => array.as_scalar(),
            _ => None,
        }
    }

    /// Read as `u64`, accepting plain integers and wrapped integer scalars.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Array(array) => match array.as_scalar() {
                Some(Scalar::Int(v)) => u64::try_from(v).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Read as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Coerce a whole parameter map into a plain JSON object.
pub fn params_to_plain(params: &Params) -> Map<String, Value> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), v.to_plain()))
        .collect()
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Number::from_f64(v).map_or(Self::Null, Self::Number)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<Scalar> for ParamValue {
    fn from(v: Scalar) -> Self {
        Self::from(v.to_value())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NdArray> for ParamValue {
    fn from(v: NdArray) -> Self {
        Self::Array(v)
    }
}

impl From<Params> for ParamValue {
    fn from(v: Params) -> Self {
        Self::Map(v)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_plain().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}
