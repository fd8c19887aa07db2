//! Structural decoding of untyped JSON into typed records.
//!
//! Decoding never coerces: a value of the wrong JSON type, an unknown enum
//! spelling or an out-of-range number fails with a [`DecodeError`] naming the
//! exact path. Absent optional fields decode to `None`; `null` is only accepted
//! where a shape explicitly allows it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::ids::{AttachmentId, JobId, ProjectId, SectionId};

pub trait Decode: Sized {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError>;
}

pub(crate) fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Field access on a JSON object with path-qualified errors.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    pub(crate) fn of(value: &'a Value, path: &'a str) -> Result<Self, DecodeError> {
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            _ => Err(DecodeError::new(path, "object")),
        }
    }

    pub(crate) fn path(&self, key: &str) -> String {
        child_path(self.path, key)
    }

    pub(crate) fn required<T: Decode>(&self, key: &str) -> Result<T, DecodeError> {
        self.required_with(key, T::decode)
    }

    pub(crate) fn required_with<T>(
        &self,
        key: &str,
        decode: impl FnOnce(&Value, &str) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let path = self.path(key);
        match self.map.get(key) {
            Some(value) => decode(value, &path),
            None => Err(DecodeError::new(path, "required field")),
        }
    }

    pub(crate) fn optional<T: Decode>(&self, key: &str) -> Result<Option<T>, DecodeError> {
        self.optional_with(key, T::decode)
    }

    pub(crate) fn optional_with<T>(
        &self,
        key: &str,
        decode: impl FnOnce(&Value, &str) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        match self.map.get(key) {
            Some(value) => decode(value, &self.path(key)).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`Fields::optional`], but an explicit `null` also means absent.
    pub(crate) fn nullable<T: Decode>(&self, key: &str) -> Result<Option<T>, DecodeError> {
        match self.map.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => T::decode(value, &self.path(key)).map(Some),
        }
    }
}

impl Decode for String {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DecodeError::new(path, "string"))
    }
}

impl Decode for bool {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| DecodeError::new(path, "boolean"))
    }
}

impl Decode for u32 {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| DecodeError::new(path, "non-negative integer"))
    }
}

impl Decode for u64 {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_u64()
            .ok_or_else(|| DecodeError::new(path, "non-negative integer"))
    }
}

impl Decode for i64 {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value.as_i64().ok_or_else(|| DecodeError::new(path, "integer"))
    }
}

impl Decode for f64 {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| DecodeError::new(path, "finite number"))
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let items = value
            .as_array()
            .ok_or_else(|| DecodeError::new(path, "array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::decode(item, &index_path(path, i)))
            .collect()
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: From<String> + Ord,
    V: Decode,
{
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let map = value
            .as_object()
            .ok_or_else(|| DecodeError::new(path, "object map"))?;
        map.iter()
            .map(|(key, item)| {
                let item = V::decode(item, &child_path(path, key))?;
                Ok((K::from(key.clone()), item))
            })
            .collect()
    }
}

macro_rules! decode_text_id {
    ($($name:ident),+) => {
        $(
            impl Decode for $name {
                fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
                    String::decode(value, path).map($name::from)
                }
            }
        )+
    };
}

decode_text_id!(ProjectId, SectionId, JobId, AttachmentId);

/// Implements [`Decode`] for enums declared with `wire_enum!`.
macro_rules! decode_wire_enum {
    ($($name:ty),+ $(,)?) => {
        $(
            impl $crate::decode::Decode for $name {
                fn decode(
                    value: &::serde_json::Value,
                    path: &str,
                ) -> Result<Self, $crate::error::DecodeError> {
                    let expected = || {
                        let names: Vec<&str> = <$name>::ALL.iter().map(|v| v.as_str()).collect();
                        $crate::error::DecodeError::new(path, format!("one of {}", names.join("|")))
                    };
                    value.as_str().and_then(<$name>::parse).ok_or_else(expected)
                }
            }
        )+
    };
}

pub(crate) use decode_wire_enum;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_reject_wrong_json_types() {
        assert!(String::decode(&json!(1), "a").is_err());
        assert!(bool::decode(&json!("true"), "a").is_err());
        assert_eq!(u32::decode(&json!(-1), "n").unwrap_err().expected, "non-negative integer");
        assert!(i64::decode(&json!(1.5), "n").is_err());
        assert_eq!(f64::decode(&json!(2), "n").unwrap(), 2.0);
    }

    #[test]
    fn nested_errors_carry_full_path() {
        let value = json!({ "items": ["a", 3] });
        let fields = Fields::of(&value, "root").unwrap();
        let err = fields.required::<Vec<String>>("items").unwrap_err();
        assert_eq!(err.path, "root.items[1]");
        assert_eq!(err.to_string(), "at root.items[1]: expected string");
    }

    #[test]
    fn optional_distinguishes_absent_from_null() {
        let value = json!({ "present": null });
        let fields = Fields::of(&value, "").unwrap();
        assert_eq!(fields.optional::<String>("missing").unwrap(), None);
        assert!(fields.optional::<String>("present").is_err());
        assert_eq!(fields.nullable::<String>("present").unwrap(), None);
    }

    #[test]
    fn maps_decode_with_typed_keys() {
        let value = json!({ "s1": ["h1", "h2"] });
        let map = BTreeMap::<SectionId, Vec<String>>::decode(&value, "hashes").unwrap();
        assert_eq!(map.get("s1").map(Vec::len), Some(2));
        let bad = json!({ "s1": "h1" });
        let err = BTreeMap::<SectionId, Vec<String>>::decode(&bad, "hashes").unwrap_err();
        assert_eq!(err.path, "hashes.s1");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let value = json!({});
        let err = Fields::of(&value, "p").unwrap().required::<String>("id").unwrap_err();
        assert_eq!(err, DecodeError::new("p.id", "required field"));
    }
}
