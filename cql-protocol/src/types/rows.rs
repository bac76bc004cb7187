use std::net::IpAddr;
use std::sync::Arc;

use ::uuid::Uuid;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::frame::message_result::{BodyResResultRows, ColSpec, ColType, ColumnType, RowsMetadata};
use crate::frame::{FromBytes, Version};
use crate::types::blob::Blob;
use crate::types::collections::decode_list;
use crate::types::decimal::{varint_from_bytes, Decimal};
use crate::types::timestamp::from_millis;
use crate::types::{
    try_f32_from_bytes, try_f64_from_bytes, try_i16_from_bytes, try_i32_from_bytes,
    try_i64_from_bytes, CBytes,
};

/// Conversion of a single non-null cell into a Rust value.
pub trait TryFromCell: Sized {
    fn try_from_cell(bytes: &[u8], col_type: &ColumnType, version: Version) -> Result<Self>;
}

fn expect_type(col_type: &ColumnType, expected: &[ColType]) -> Result<()> {
    if expected.contains(&col_type.id()) {
        Ok(())
    } else {
        Err(Error::General(format!(
            "Cannot convert column of type {} into {:?}",
            col_type.id(),
            expected
        )))
    }
}

macro_rules! impl_try_from_cell {
    ($t:ty, $convert:expr, $($col_type:expr),+) => {
        impl TryFromCell for $t {
            fn try_from_cell(bytes: &[u8], col_type: &ColumnType, _version: Version) -> Result<Self> {
                expect_type(col_type, &[$($col_type),+])?;
                $convert(bytes)
            }
        }
    };
}

impl_try_from_cell!(
    i8,
    |bytes: &[u8]| match bytes {
        [value] => Ok(*value as i8),
        _ => Err(Error::General(format!("Invalid tinyint length: {}", bytes.len()))),
    },
    ColType::Tinyint
);
impl_try_from_cell!(
    i16,
    |bytes: &[u8]| try_i16_from_bytes(bytes).map_err(Error::from),
    ColType::Smallint
);
impl_try_from_cell!(
    i32,
    |bytes: &[u8]| try_i32_from_bytes(bytes).map_err(Error::from),
    ColType::Int
);
impl_try_from_cell!(
    i64,
    |bytes: &[u8]| try_i64_from_bytes(bytes).map_err(Error::from),
    ColType::Bigint,
    ColType::Counter,
    ColType::Time
);
impl_try_from_cell!(
    f32,
    |bytes: &[u8]| try_f32_from_bytes(bytes).map_err(Error::from),
    ColType::Float
);
impl_try_from_cell!(
    f64,
    |bytes: &[u8]| try_f64_from_bytes(bytes).map_err(Error::from),
    ColType::Double
);
impl_try_from_cell!(
    bool,
    |bytes: &[u8]| match bytes {
        [value] => Ok(*value != 0),
        _ => Err(Error::General(format!("Invalid boolean length: {}", bytes.len()))),
    },
    ColType::Boolean
);
impl_try_from_cell!(
    String,
    |bytes: &[u8]| String::from_utf8(bytes.to_vec()).map_err(Error::from),
    ColType::Ascii,
    ColType::Text,
    ColType::Varchar
);
impl_try_from_cell!(
    Blob,
    |bytes: &[u8]| Ok(Blob::from(bytes)),
    ColType::Blob,
    ColType::Custom
);
impl_try_from_cell!(
    Uuid,
    |bytes: &[u8]| Uuid::from_slice(bytes).map_err(Error::from),
    ColType::Uuid,
    ColType::Timeuuid
);
impl_try_from_cell!(
    BigInt,
    |bytes: &[u8]| Ok(varint_from_bytes(bytes)),
    ColType::Varint
);
impl_try_from_cell!(Decimal, Decimal::from_bytes, ColType::Decimal);
impl_try_from_cell!(
    DateTime<Utc>,
    |bytes: &[u8]| try_i64_from_bytes(bytes)
        .map_err(Error::from)
        .and_then(from_millis),
    ColType::Timestamp
);
impl_try_from_cell!(
    IpAddr,
    |bytes: &[u8]| match bytes.len() {
        4 => Ok(IpAddr::from([bytes[0], bytes[1], bytes[2], bytes[3]])),
        16 => {
            let mut octets = [0; 16];
            octets.copy_from_slice(bytes);
            Ok(IpAddr::from(octets))
        }
        len => Err(Error::General(format!("Invalid inet length: {len}"))),
    },
    ColType::Inet
);

impl<T: TryFromCell> TryFromCell for Vec<T> {
    fn try_from_cell(bytes: &[u8], col_type: &ColumnType, version: Version) -> Result<Self> {
        let element_type = col_type.element_type().ok_or_else(|| {
            Error::General(format!(
                "Cannot convert column of type {} into a list",
                col_type.id()
            ))
        })?;

        decode_list(bytes, version)?
            .into_iter()
            .map(|element| {
                element
                    .ok_or_else(|| Error::General("Null element in collection".into()))
                    .and_then(|element| T::try_from_cell(&element, element_type, version))
            })
            .collect()
    }
}

/// Single row of a rows result, sharing the column metadata of its result.
#[derive(Clone, Debug)]
pub struct Row {
    metadata: Arc<RowsMetadata>,
    row_content: Vec<CBytes>,
    protocol_version: Version,
}

impl Row {
    pub fn from_body(body: BodyResResultRows) -> Vec<Row> {
        let metadata = Arc::new(body.metadata);
        let protocol_version = body.protocol_version;
        body.rows
            .into_iter()
            .map(|row| Row {
                metadata: metadata.clone(),
                row_content: row,
                protocol_version,
            })
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.row_content.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_content.is_empty()
    }

    /// Checks if a column is present in the row.
    pub fn contains_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Checks for NULL for a given column. Returns false if given column does not exist.
    pub fn is_null(&self, index: usize) -> bool {
        self.row_content
            .get(index)
            .map(|data| data.as_slice().is_none())
            .unwrap_or(false)
    }

    #[inline]
    pub fn get_raw(&self, index: usize) -> Option<&CBytes> {
        self.row_content.get(index)
    }

    pub fn get_raw_by_name(&self, name: &str) -> Option<&CBytes> {
        self.index_of(name).and_then(|index| self.get_raw(index))
    }

    /// Converts the cell at `index`. Returns `None` for null cells.
    pub fn get_by_index<T: TryFromCell>(&self, index: usize) -> Result<Option<T>> {
        let spec = self.metadata.col_specs.get(index).ok_or_else(|| {
            Error::General(format!("No column metadata for index {index}"))
        })?;

        self.convert(spec, index)
    }

    /// Converts the cell of the named column. Returns `None` for null cells.
    pub fn get_by_name<T: TryFromCell>(&self, name: &str) -> Result<Option<T>> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::General(format!("Column {name} not found")))?;

        self.convert(&self.metadata.col_specs[index], index)
    }

    fn convert<T: TryFromCell>(&self, spec: &ColSpec, index: usize) -> Result<Option<T>> {
        let cell = self
            .row_content
            .get(index)
            .ok_or_else(|| Error::General(format!("No cell at index {index}")))?;

        cell.as_slice()
            .map(|bytes| T::try_from_cell(bytes, &spec.col_type, self.protocol_version))
            .transpose()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.metadata
            .col_specs
            .iter()
            .position(|spec| spec.name.as_str() == name)
    }
}
