//! `list`, `set` and `map` encodings. Before V3 the element count and every element length are
//! unsigned 2-byte shorts and elements cannot be null; from V3 on both are 4-byte ints.

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::value::Value;
use crate::types::{check_short_len, cursor_next_value, CInt};

/// Elements of a `list` or `set`, or entries of a `map`.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash)]
pub enum CollectionValue {
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl CollectionValue {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            CollectionValue::List(elements) => elements.len(),
            CollectionValue::Map(entries) => entries.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            CollectionValue::List(elements) => Box::new(elements.iter()),
            CollectionValue::Map(entries) => {
                Box::new(entries.iter().flat_map(|(key, value)| [key, value]))
            }
        }
    }

    /// Fails if the collection, or any nested one, cannot be encoded with `version`.
    pub fn check_version(&self, version: Version) -> Result<()> {
        let short = version.uses_short_collections();
        if short {
            check_short_len(self.len(), "Collection size")?;
        }

        for element in self.elements() {
            if let Value::Collection(nested) = element {
                nested.check_version(version)?;
            }

            if !short {
                continue;
            }

            match element.to_bytes(version) {
                Some(bytes) => check_short_len(bytes.len(), "Collection element length")?,
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "Null collection elements cannot be encoded with protocol {version}"
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Serialize for CollectionValue {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_len(self.len(), cursor, version);

        match self {
            CollectionValue::List(elements) => {
                for element in elements {
                    serialize_element(element, cursor, version);
                }
            }
            CollectionValue::Map(entries) => {
                for (key, value) in entries {
                    serialize_element(key, cursor, version);
                    serialize_element(value, cursor, version);
                }
            }
        }
    }
}

fn serialize_len(len: usize, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
    if version.uses_short_collections() {
        (len as u16).serialize(cursor, version);
    } else {
        (len as CInt).serialize(cursor, version);
    }
}

fn serialize_element(element: &Value, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
    match element.to_bytes(version) {
        Some(bytes) => {
            serialize_len(bytes.len(), cursor, version);
            bytes.serialize(cursor, version);
        }
        // unreachable for checked values
        None if version.uses_short_collections() => u16::MAX.serialize(cursor, version),
        None => (-1 as CInt).serialize(cursor, version),
    }
}

fn read_len(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<i32> {
    if version.uses_short_collections() {
        u16::from_cursor(cursor, version).map(i32::from)
    } else {
        CInt::from_cursor(cursor, version)
    }
}

fn read_element(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<Option<Vec<u8>>> {
    let len = read_len(cursor, version)?;
    if len < 0 {
        return Ok(None);
    }

    cursor_next_value(cursor, len as usize).map(Some)
}

fn read_count(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<usize> {
    let count = read_len(cursor, version)?;
    usize::try_from(count)
        .map_err(|_| Error::General(format!("Invalid collection element count: {count}")))
}

/// Decodes the raw elements of a `list` or `set` cell.
pub fn decode_list(bytes: &[u8], version: Version) -> Result<Vec<Option<Vec<u8>>>> {
    let mut cursor = Cursor::new(bytes);
    let count = read_count(&mut cursor, version)?;

    (0..count)
        .map(|_| read_element(&mut cursor, version))
        .collect()
}

/// Decodes the raw entries of a `map` cell.
#[allow(clippy::type_complexity)]
pub fn decode_map(
    bytes: &[u8],
    version: Version,
) -> Result<Vec<(Option<Vec<u8>>, Option<Vec<u8>>)>> {
    let mut cursor = Cursor::new(bytes);
    let count = read_count(&mut cursor, version)?;

    (0..count)
        .map(|_| {
            let key = read_element(&mut cursor, version)?;
            let value = read_element(&mut cursor, version)?;
            Ok((key, value))
        })
        .collect()
}
