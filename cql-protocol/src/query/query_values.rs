use std::collections::HashMap;
use std::hash::Hash;
use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, ProtocolFeature, Serialize, Version};
use crate::types::value::Value;
use crate::types::{check_short_len, from_cursor_str, serialize_str};

/// Bound values, either positional or named. Named values keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryValues {
    SimpleValues(Vec<Value>),
    NamedValues(Vec<(String, Value)>),
}

impl QueryValues {
    #[inline]
    pub fn has_names(&self) -> bool {
        matches!(self, QueryValues::NamedValues(_))
    }

    pub fn len(&self) -> usize {
        match self {
            QueryValues::SimpleValues(values) => values.len(),
            QueryValues::NamedValues(values) => values.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        let (simple, named) = match self {
            QueryValues::SimpleValues(values) => (Some(values.iter()), None),
            QueryValues::NamedValues(values) => (None, Some(values.iter().map(|(_, value)| value))),
        };

        simple.into_iter().flatten().chain(named.into_iter().flatten())
    }

    /// Fails if the values use names, unset markers or collections the version cannot encode, or
    /// if there are more values than a `[short]` count can hold.
    pub fn check_version(&self, version: Version) -> error::Result<()> {
        check_short_len(self.len(), "Value count")?;

        if self.has_names() {
            version.check(ProtocolFeature::NamedValues)?;
        }

        if self.values().any(Value::is_not_set) {
            version.check(ProtocolFeature::UnsetValues)?;
        }

        self.values()
            .try_for_each(|value| value.check_version(version))
    }

    /// Reads `count` values; names are expected when `with_names` is set.
    pub fn from_cursor_with_count(
        cursor: &mut Cursor<&[u8]>,
        count: u16,
        with_names: bool,
        version: Version,
    ) -> error::Result<QueryValues> {
        let capacity = count as usize;
        if with_names {
            let mut values = Vec::with_capacity(capacity);
            for _ in 0..count {
                let name = from_cursor_str(cursor)?.to_string();
                values.push((name, Value::from_cursor(cursor, version)?));
            }

            Ok(QueryValues::NamedValues(values))
        } else {
            let mut values = Vec::with_capacity(capacity);
            for _ in 0..count {
                values.push(Value::from_cursor(cursor, version)?);
            }

            Ok(QueryValues::SimpleValues(values))
        }
    }
}

impl Default for QueryValues {
    fn default() -> Self {
        QueryValues::SimpleValues(vec![])
    }
}

impl<T: Into<Value>> From<Vec<T>> for QueryValues {
    fn from(values: Vec<T>) -> QueryValues {
        QueryValues::SimpleValues(values.into_iter().map(Into::into).collect())
    }
}

impl<'a, T: Into<Value> + Clone> From<&'a [T]> for QueryValues {
    fn from(values: &'a [T]) -> QueryValues {
        QueryValues::SimpleValues(values.iter().cloned().map(Into::into).collect())
    }
}

impl<S: ToString + Hash + Eq, V: Into<Value>> From<HashMap<S, V>> for QueryValues {
    fn from(values: HashMap<S, V>) -> QueryValues {
        QueryValues::NamedValues(
            values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.into()))
                .collect(),
        )
    }
}

/// Serializes the values without the leading count.
impl Serialize for QueryValues {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match self {
            QueryValues::SimpleValues(values) => {
                for value in values {
                    value.serialize(cursor, version);
                }
            }
            QueryValues::NamedValues(values) => {
                for (name, value) in values {
                    serialize_str(cursor, name, version);
                    value.serialize(cursor, version);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_named_values_in_order() {
        let values = QueryValues::NamedValues(vec![
            ("b".into(), Value::new(1i32)),
            ("a".into(), Value::Null),
        ]);

        assert_eq!(
            values.serialize_to_vec(Version::V4),
            vec![0, 1, b'b', 0, 0, 0, 4, 0, 0, 0, 1, 0, 1, b'a', 255, 255, 255, 255]
        );
    }

    #[test]
    fn should_gate_names_and_unset_values() {
        let named = QueryValues::NamedValues(vec![("a".into(), Value::new(1i32))]);
        assert!(named.check_version(Version::V2).is_err());
        assert!(named.check_version(Version::V3).is_ok());

        let unset = QueryValues::SimpleValues(vec![Value::NotSet]);
        assert!(unset.check_version(Version::V3).is_err());
        assert!(unset.check_version(Version::V4).is_ok());
    }

    #[test]
    fn should_check_collections_and_value_count() {
        let long_element = QueryValues::SimpleValues(vec![Value::list(vec![Value::new(
            "x".repeat(70_000).as_str(),
        )])]);
        assert!(matches!(
            long_element.check_version(Version::V2),
            Err(crate::Error::InvalidArgument(_))
        ));
        assert!(long_element.check_version(Version::V3).is_ok());

        let too_many = QueryValues::SimpleValues(vec![Value::new(1i8); 65_536]);
        assert!(matches!(
            too_many.check_version(Version::V4),
            Err(crate::Error::InvalidArgument(_))
        ));

        let most = QueryValues::SimpleValues(vec![Value::new(1i8); 40_000]);
        assert!(most.check_version(Version::V4).is_ok());

        let bytes = most.serialize_to_vec(Version::V4);
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(
            QueryValues::from_cursor_with_count(&mut cursor, 40_000, false, Version::V4).unwrap(),
            most
        );
    }

    #[test]
    fn should_read_values_back() {
        let values = QueryValues::NamedValues(vec![("k".into(), Value::new("v"))]);
        let bytes = values.serialize_to_vec(Version::V4);
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        assert_eq!(
            QueryValues::from_cursor_with_count(&mut cursor, 1, true, Version::V4).unwrap(),
            values
        );
    }

    #[test]
    fn should_convert_from_vec() {
        let values = QueryValues::from(vec![1i32, 2i32]);
        assert_eq!(values.len(), 2);
        assert!(!values.has_names());
    }
}
