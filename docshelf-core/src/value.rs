//! Hashable field values used as primary keys and secondary index bucket keys.
//!
//! Documents expose their fields to the indexer as [`FieldValue`]s. Integers of every width
//! normalise to the same variant so `1u64` stored in a document matches a lookup with `1`.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use std::{collections::HashSet, fmt};
use uuid::Uuid;

/// A scalar value read from a document field.
///
/// Equality is exact: an `Int(1)` never equals a `Float` holding `1.0`, and strings compare
/// byte for byte. Floats are stored as their bit pattern with `-0.0` folded into `0.0` and
/// every NaN folded into one canonical NaN, which keeps the type `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldValue {
    /// Absent or explicitly null field.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Any signed or unsigned integer up to 64 bits.
    Int(i128),
    /// Bit pattern of a normalised `f64`. Build with [`FieldValue::float`].
    Float(u64),
    /// String value.
    String(String),
    /// UUID value.
    Uuid(Uuid),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
}

impl FieldValue {
    /// Creates a float value, normalising signed zero and NaN.
    pub fn float(value: f64) -> Self {
        let value = if value == 0.0 {
            0.0
        } else if value.is_nan() {
            f64::NAN
        } else {
            value
        };

        FieldValue::Float(value.to_bits())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            FieldValue::String(value) => write!(f, "\"{value}\""),
            FieldValue::Uuid(value) => write!(f, "{value}"),
            FieldValue::DateTime(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Int(value as i128)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::float(value as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::float(value)
    }
}

impl From<char> for FieldValue {
    fn from(value: char) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::String(value.clone())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<bson::Uuid> for FieldValue {
    fn from(value: bson::Uuid) -> Self {
        FieldValue::Uuid(Uuid::from_bytes(value.bytes()))
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<&FieldValue> for FieldValue {
    fn from(value: &FieldValue) -> Self {
        value.clone()
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => FieldValue::Null,
        }
    }
}

/// A deduplicated batch of primary keys, in first-seen order.
///
/// Built from a single key or from any common collection of keys, so
/// [`Collection::delete_by_primary_key`](crate::collection::Collection::delete_by_primary_key)
/// accepts `1`, `vec![1, 2]`, `[1, 2]` or a `HashSet` alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: IndexSet<FieldValue>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key unless it is already part of the batch.
    pub fn insert(&mut self, key: impl Into<FieldValue>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldValue> {
        self.keys.iter()
    }
}

impl<K: Into<FieldValue>> FromIterator<K> for KeySet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = KeySet::new();

        for key in iter {
            set.insert(key);
        }

        set
    }
}

impl IntoIterator for KeySet {
    type Item = FieldValue;
    type IntoIter = indexmap::set::IntoIter<FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

macro_rules! impl_key_set {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeySet {
                fn from(key: $ty) -> Self {
                    std::iter::once(key).collect()
                }
            }

            impl From<Vec<$ty>> for KeySet {
                fn from(keys: Vec<$ty>) -> Self {
                    keys.into_iter().collect()
                }
            }

            impl From<&[$ty]> for KeySet {
                fn from(keys: &[$ty]) -> Self {
                    keys.iter().cloned().collect()
                }
            }

            impl<const N: usize> From<[$ty; N]> for KeySet {
                fn from(keys: [$ty; N]) -> Self {
                    keys.into_iter().collect()
                }
            }

            impl From<HashSet<$ty>> for KeySet {
                fn from(keys: HashSet<$ty>) -> Self {
                    keys.into_iter().collect()
                }
            }
        )*
    };
}

impl_key_set!(
    FieldValue, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, char, String, Uuid,
    DateTime<Utc>
);

impl<'a> From<&'a str> for KeySet {
    fn from(key: &'a str) -> Self {
        std::iter::once(key).collect()
    }
}

impl<'a> From<Vec<&'a str>> for KeySet {
    fn from(keys: Vec<&'a str>) -> Self {
        keys.into_iter().collect()
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for KeySet {
    fn from(keys: [&'a str; N]) -> Self {
        keys.into_iter().collect()
    }
}
