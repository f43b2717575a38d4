// ============================================================
// Layer 4 - Tensor Coercion
// ============================================================
// Every input column ends up as a long-integer HostTensor no
// matter how the loader produced it:
//
//   NumericArray       → values cast to i64 (truncating)
//   HostTensor         → taken as-is
//   [T] / RawInput::List → each element coerced, structure kept
//   serde_json::Value  → numeric rectangular arrays become arrays,
//                        strings / objects / bools / null are
//                        rejected with UnsupportedType
//
// Each representation implements `Coerce`; RawInput dispatches
// to the right impl by matching on its variant.

use serde_json::Value;

use crate::domain::bundle::{HostTensor, NumericArray, RawInput};
use crate::domain::error::DataError;

/// Result of coercion: a tensor, or a list that mirrors the input's nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Tensor(HostTensor),
    List(Vec<Coerced>),
}

impl Coerced {
    /// Unwrap a single tensor. Lists are several streams, not one column.
    pub fn into_tensor(self) -> Result<HostTensor, DataError> {
        match self {
            Coerced::Tensor(t) => Ok(t),
            Coerced::List(_) => Err(DataError::UnsupportedType {
                found: "list of streams where a single tensor column was expected".into(),
            }),
        }
    }

    /// All values depth-first, in storage order.
    #[cfg(test)]
    pub fn flat_values(&self) -> Vec<i64> {
        match self {
            Coerced::Tensor(t) => t.values().to_vec(),
            Coerced::List(items) => items.iter().flat_map(Coerced::flat_values).collect(),
        }
    }

    /// First tensor met depth-first.
    pub fn first_tensor(&self) -> Option<&HostTensor> {
        match self {
            Coerced::Tensor(t) => Some(t),
            Coerced::List(items) => items.iter().find_map(Coerced::first_tensor),
        }
    }
}

pub trait Coerce {
    fn coerce(&self) -> Result<Coerced, DataError>;
}

impl Coerce for NumericArray {
    fn coerce(&self) -> Result<Coerced, DataError> {
        let data = self.values.iter().map(|&v| v as i64).collect();
        Ok(Coerced::Tensor(HostTensor::new(data, self.shape.clone())?))
    }
}

impl Coerce for HostTensor {
    fn coerce(&self) -> Result<Coerced, DataError> {
        Ok(Coerced::Tensor(self.clone()))
    }
}

impl<T: Coerce> Coerce for [T] {
    fn coerce(&self) -> Result<Coerced, DataError> {
        let items = self.iter().map(Coerce::coerce).collect::<Result<Vec<_>, _>>()?;
        Ok(Coerced::List(items))
    }
}

impl Coerce for Value {
    fn coerce(&self) -> Result<Coerced, DataError> {
        match self {
            Value::Array(_) => json_to_array(self)?.coerce(),
            other => Err(DataError::UnsupportedType { found: json_type_name(other).into() }),
        }
    }
}

impl Coerce for RawInput {
    fn coerce(&self) -> Result<Coerced, DataError> {
        match self {
            RawInput::Array(a)   => a.coerce(),
            RawInput::Tensor(t)  => t.coerce(),
            RawInput::List(xs)   => xs.as_slice().coerce(),
            RawInput::Json(v)    => v.coerce(),
        }
    }
}

// ─── JSON → NumericArray ──────────────────────────────────────────────────────
// The shape is read off the first-element chain ([[1,2],[3,4]] → [2, 2]);
// every other branch must then agree with it.
fn json_to_array(value: &Value) -> Result<NumericArray, DataError> {
    let mut shape  = Vec::new();
    let mut cursor = value;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None        => break,
        }
    }

    let mut values = Vec::with_capacity(shape.iter().product());
    flatten_json(value, &shape, 0, &mut values)?;
    NumericArray::new(values, shape)
}

fn flatten_json(
    value: &Value,
    shape: &[usize],
    depth: usize,
    out:   &mut Vec<f64>,
) -> Result<(), DataError> {
    match value {
        Value::Array(items) => {
            let expected = shape.get(depth).copied().unwrap_or(0);
            if depth >= shape.len() || items.len() != expected {
                return Err(DataError::ShapeMismatch {
                    what:  "nested array length",
                    left:  items.len(),
                    right: expected,
                });
            }
            items.iter().try_for_each(|item| flatten_json(item, shape, depth + 1, out))
        }
        Value::Number(n) => {
            if depth != shape.len() {
                return Err(DataError::ShapeMismatch {
                    what:  "nested array depth",
                    left:  depth,
                    right: shape.len(),
                });
            }
            let v = n.as_f64().ok_or_else(|| DataError::UnsupportedType {
                found: format!("number {n}"),
            })?;
            out.push(v);
            Ok(())
        }
        other => Err(DataError::UnsupportedType { found: json_type_name(other).into() }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}
