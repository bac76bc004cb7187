use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{Cursor, Read};
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Constructor;
use num_bigint::BigInt;
use ::uuid::Uuid;

use super::blob::Blob;
use super::collections::CollectionValue;
use super::decimal::{varint_to_bytes, Decimal};
use super::timestamp::millis_since_epoch;
use super::*;
use crate::Error;

const NULL_INT_VALUE: i32 = -1;
const NOT_SET_INT_VALUE: i32 = -2;

/// Bound value: raw bytes, a collection encoded for the negotiated version, null or unset.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash)]
pub enum Value {
    Some(Vec<u8>),
    Collection(CollectionValue),
    Null,
    NotSet,
}

impl Value {
    pub fn new<B>(v: B) -> Value
    where
        B: Into<Bytes>,
    {
        Value::Some(v.into().0)
    }

    /// Builds a `list` or `set` value.
    pub fn list<T: Into<Value>>(elements: impl IntoIterator<Item = T>) -> Value {
        Value::Collection(CollectionValue::List(
            elements.into_iter().map(Into::into).collect(),
        ))
    }

    /// Builds a `map` value, keeping the iteration order of `entries`.
    pub fn map<K: Into<Value>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Value {
        Value::Collection(CollectionValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    #[inline]
    pub fn is_not_set(&self) -> bool {
        matches!(self, Value::NotSet)
    }

    /// Fails if a collection value cannot be encoded with `version`.
    pub fn check_version(&self, version: Version) -> Result<()> {
        match self {
            Value::Collection(collection) => collection.check_version(version),
            _ => Ok(()),
        }
    }

    /// Raw cell bytes for the given version, `None` for null and unset values.
    pub fn to_bytes(&self, version: Version) -> Option<Vec<u8>> {
        match self {
            Value::Some(bytes) => Some(bytes.clone()),
            Value::Collection(collection) => Some(collection.serialize_to_vec(version)),
            Value::Null | Value::NotSet => None,
        }
    }
}

impl Serialize for Value {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match self {
            Value::Null => NULL_INT_VALUE.serialize(cursor, version),
            Value::NotSet => NOT_SET_INT_VALUE.serialize(cursor, version),
            Value::Some(value) => {
                let len = value.len() as CInt;
                len.serialize(cursor, version);
                value.serialize(cursor, version);
            }
            Value::Collection(collection) => {
                let value = collection.serialize_to_vec(version);
                let len = value.len() as CInt;
                len.serialize(cursor, version);
                value.serialize(cursor, version);
            }
        }
    }
}

impl FromCursor for Value {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Value> {
        let value_size = {
            let mut buff = [0; INT_LEN];
            cursor.read_exact(&mut buff)?;
            CInt::from_be_bytes(buff)
        };

        match value_size {
            NULL_INT_VALUE => Ok(Value::Null),
            NOT_SET_INT_VALUE => Ok(Value::NotSet),
            size if size >= 0 => Ok(Value::Some(cursor_next_value(cursor, size as usize)?)),
            size => Err(Error::General(format!("Invalid value length: {size}"))),
        }
    }
}

impl<T: Into<Bytes>> From<T> for Value {
    fn from(b: T) -> Value {
        Value::new(b.into())
    }
}

impl<T: Into<Bytes>> From<Option<T>> for Value {
    fn from(b: Option<T>) -> Value {
        match b {
            Some(b) => Value::new(b.into()),
            None => Value::Null,
        }
    }
}

impl From<CollectionValue> for Value {
    #[inline]
    fn from(value: CollectionValue) -> Self {
        Value::Collection(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Value {
        Value::list(vec)
    }
}

impl<T: Into<Value>> From<HashSet<T>> for Value {
    fn from(set: HashSet<T>) -> Value {
        Value::list(set)
    }
}

impl<T: Into<Value>> From<BTreeSet<T>> for Value {
    fn from(set: BTreeSet<T>) -> Value {
        Value::list(set)
    }
}

impl<K: Into<Value>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(map: HashMap<K, V>) -> Value {
        Value::map(map)
    }
}

impl<K: Into<Value>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Value {
        Value::map(map)
    }
}

/// Encoded form of a single scalar value.
#[derive(Debug, Clone, Constructor)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// Consumes `Bytes` and returns the inner `Vec<u8>`
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<String> for Bytes {
    #[inline]
    fn from(value: String) -> Self {
        Bytes(value.into_bytes())
    }
}

impl From<&str> for Bytes {
    #[inline]
    fn from(value: &str) -> Self {
        Bytes(value.as_bytes().to_vec())
    }
}

macro_rules! impl_from_be_bytes {
    ($t:ty) => {
        impl From<$t> for Bytes {
            #[inline]
            fn from(value: $t) -> Self {
                Bytes(value.to_be_bytes().to_vec())
            }
        }
    };
}

impl_from_be_bytes!(i8);
impl_from_be_bytes!(i16);
impl_from_be_bytes!(i32);
impl_from_be_bytes!(i64);
impl_from_be_bytes!(f32);
impl_from_be_bytes!(f64);

impl From<bool> for Bytes {
    #[inline]
    fn from(value: bool) -> Self {
        Bytes(vec![value as u8])
    }
}

impl From<Uuid> for Bytes {
    #[inline]
    fn from(value: Uuid) -> Self {
        Bytes(value.as_bytes().to_vec())
    }
}

impl From<IpAddr> for Bytes {
    #[inline]
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(ip) => Bytes(ip.octets().to_vec()),
            IpAddr::V6(ip) => Bytes(ip.octets().to_vec()),
        }
    }
}

impl From<Blob> for Bytes {
    #[inline]
    fn from(value: Blob) -> Self {
        Bytes(value.into_vec())
    }
}

impl From<Decimal> for Bytes {
    #[inline]
    fn from(value: Decimal) -> Self {
        // decimal layout does not depend on the protocol version
        Bytes(value.serialize_to_vec(Version::default()))
    }
}

impl From<BigInt> for Bytes {
    #[inline]
    fn from(value: BigInt) -> Self {
        Bytes(varint_to_bytes(&value))
    }
}

impl From<DateTime<Utc>> for Bytes {
    #[inline]
    fn from(value: DateTime<Utc>) -> Self {
        millis_since_epoch(&value).into()
    }
}

/// `date` values are days since the epoch, centered on 2^31.
impl From<NaiveDate> for Bytes {
    fn from(value: NaiveDate) -> Self {
        let days = value
            .signed_duration_since(NaiveDate::default())
            .num_days();
        Bytes(((days + (1i64 << 31)) as u32).to_be_bytes().to_vec())
    }
}
