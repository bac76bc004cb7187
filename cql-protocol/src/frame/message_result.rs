//! RESULT response bodies and the column metadata they carry.
use bitflags::bitflags;
use derive_more::Display;
use std::convert::TryFrom;
use std::io::Cursor;

use crate::error;
use crate::error::Error;
use crate::frame::message_event::SchemaChange;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::rows::Row;
use crate::types::{CBytes, CBytesShort, CInt, CIntShort};

const VOID: CInt = 0x0001;
const ROWS: CInt = 0x0002;
const SET_KEYSPACE: CInt = 0x0003;
const PREPARED: CInt = 0x0004;
const SCHEMA_CHANGE: CInt = 0x0005;

/// Body of a RESULT response.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum ResResultBody {
    Void,
    Rows(BodyResResultRows),
    SetKeyspace(BodyResResultSetKeyspace),
    Prepared(BodyResResultPrepared),
    SchemaChange(SchemaChange),
}

impl ResResultBody {
    fn kind(&self) -> CInt {
        match self {
            ResResultBody::Void => VOID,
            ResResultBody::Rows(_) => ROWS,
            ResResultBody::SetKeyspace(_) => SET_KEYSPACE,
            ResResultBody::Prepared(_) => PREPARED,
            ResResultBody::SchemaChange(_) => SCHEMA_CHANGE,
        }
    }

    /// Typed rows of a rows result.
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            ResResultBody::Rows(rows) => Some(Row::from_body(rows)),
            _ => None,
        }
    }

    pub fn as_rows_metadata(&self) -> Option<&RowsMetadata> {
        match self {
            ResResultBody::Rows(rows) => Some(&rows.metadata),
            _ => None,
        }
    }

    pub fn into_prepared(self) -> Option<BodyResResultPrepared> {
        match self {
            ResResultBody::Prepared(prepared) => Some(prepared),
            _ => None,
        }
    }

    pub fn into_set_keyspace(self) -> Option<BodyResResultSetKeyspace> {
        match self {
            ResResultBody::SetKeyspace(set_keyspace) => Some(set_keyspace),
            _ => None,
        }
    }
}

impl Serialize for ResResultBody {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.kind().serialize(cursor, version);

        match self {
            ResResultBody::Void => {}
            ResResultBody::Rows(rows) => rows.serialize(cursor, version),
            ResResultBody::SetKeyspace(set_keyspace) => set_keyspace.serialize(cursor, version),
            ResResultBody::Prepared(prepared) => prepared.serialize(cursor, version),
            ResResultBody::SchemaChange(change) => change.serialize(cursor, version),
        }
    }
}

impl FromCursor for ResResultBody {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<ResResultBody> {
        Ok(match CInt::from_cursor(cursor, version)? {
            VOID => ResResultBody::Void,
            ROWS => ResResultBody::Rows(FromCursor::from_cursor(cursor, version)?),
            SET_KEYSPACE => ResResultBody::SetKeyspace(FromCursor::from_cursor(cursor, version)?),
            PREPARED => ResResultBody::Prepared(FromCursor::from_cursor(cursor, version)?),
            SCHEMA_CHANGE => {
                ResResultBody::SchemaChange(FromCursor::from_cursor(cursor, version)?)
            }
            kind => return Err(Error::UnexpectedResultKind(kind)),
        })
    }
}

/// Keyspace set by a `USE` statement.
#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Clone, Hash)]
pub struct BodyResResultSetKeyspace {
    pub keyspace: String,
}

impl Serialize for BodyResResultSetKeyspace {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.keyspace.serialize(cursor, version);
    }
}

impl FromCursor for BodyResResultSetKeyspace {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        Ok(BodyResResultSetKeyspace {
            keyspace: String::from_cursor(cursor, version)?,
        })
    }
}

/// Rows result: metadata followed by rows of raw cells, one per column.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct BodyResResultRows {
    pub metadata: RowsMetadata,
    pub rows: Vec<Vec<CBytes>>,
    /// Version the cells were encoded with; collections depend on it.
    pub protocol_version: Version,
}

impl Serialize for BodyResResultRows {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.metadata.serialize(cursor, version);
        (self.rows.len() as CInt).serialize(cursor, version);

        for cell in self.rows.iter().flatten() {
            cell.serialize(cursor, version);
        }
    }
}

impl FromCursor for BodyResResultRows {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let metadata = RowsMetadata::from_cursor(cursor, version)?;
        let count = CInt::from_cursor(cursor, version)?;

        let rows = (0..count)
            .map(|_| {
                (0..metadata.columns_count)
                    .map(|_| CBytes::from_cursor(cursor, version))
                    .collect::<error::Result<Vec<_>>>()
            })
            .collect::<error::Result<_>>()?;

        Ok(BodyResResultRows {
            metadata,
            rows,
            protocol_version: version,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    struct MetadataFlags: i32 {
        const GLOBAL_TABLE_SPEC = 0x0001;
        const HAS_MORE_PAGES = 0x0002;
        const NO_METADATA = 0x0004;
        const METADATA_CHANGED = 0x0008;
    }
}

/// Metadata of a rows result. Column specs are empty when the server skipped them because the
/// request asked so.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RowsMetadata {
    pub columns_count: CInt,
    pub no_metadata: bool,
    /// Present when the server has more pages for this result.
    pub paging_state: Option<CBytes>,
    /// V5: result metadata id to send with later executions.
    pub new_metadata_id: Option<CBytesShort>,
    pub global_table_spec: Option<TableSpec>,
    pub col_specs: Vec<ColSpec>,
}

impl RowsMetadata {
    /// Metadata of a result without column specs.
    pub fn without_columns() -> Self {
        RowsMetadata {
            no_metadata: true,
            ..Default::default()
        }
    }

    fn flags(&self) -> MetadataFlags {
        let mut flags = MetadataFlags::empty();
        flags.set(MetadataFlags::NO_METADATA, self.no_metadata);
        flags.set(MetadataFlags::HAS_MORE_PAGES, self.paging_state.is_some());
        flags.set(
            MetadataFlags::METADATA_CHANGED,
            self.new_metadata_id.is_some(),
        );
        flags.set(
            MetadataFlags::GLOBAL_TABLE_SPEC,
            self.global_table_spec.is_some(),
        );
        flags
    }
}

impl Serialize for RowsMetadata {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.flags().bits().serialize(cursor, version);
        self.columns_count.serialize(cursor, version);

        if let Some(paging_state) = &self.paging_state {
            paging_state.serialize(cursor, version);
        }

        if self.no_metadata {
            return;
        }

        if let Some(id) = &self.new_metadata_id {
            id.serialize(cursor, version);
        }

        write_col_specs(&self.global_table_spec, &self.col_specs, cursor, version);
    }
}

impl FromCursor for RowsMetadata {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<RowsMetadata> {
        let flags = MetadataFlags::from_bits_truncate(CInt::from_cursor(cursor, version)?);
        let columns_count = CInt::from_cursor(cursor, version)?;
        if columns_count < 0 {
            return Err(Error::General(format!(
                "Invalid column count: {columns_count}"
            )));
        }

        let paging_state = flags
            .contains(MetadataFlags::HAS_MORE_PAGES)
            .then(|| CBytes::from_cursor(cursor, version))
            .transpose()?;

        let mut metadata = RowsMetadata {
            columns_count,
            no_metadata: flags.contains(MetadataFlags::NO_METADATA),
            paging_state,
            ..Default::default()
        };

        if metadata.no_metadata {
            return Ok(metadata);
        }

        metadata.new_metadata_id = flags
            .contains(MetadataFlags::METADATA_CHANGED)
            .then(|| CBytesShort::from_cursor(cursor, version))
            .transpose()?;

        (metadata.global_table_spec, metadata.col_specs) = read_col_specs(
            cursor,
            columns_count,
            flags.contains(MetadataFlags::GLOBAL_TABLE_SPEC),
            version,
        )?;

        Ok(metadata)
    }
}

fn write_col_specs(
    global_table_spec: &Option<TableSpec>,
    col_specs: &[ColSpec],
    cursor: &mut Cursor<&mut Vec<u8>>,
    version: Version,
) {
    if let Some(table_spec) = global_table_spec {
        table_spec.serialize(cursor, version);
    }

    for spec in col_specs {
        if global_table_spec.is_none() {
            spec.table_spec.serialize(cursor, version);
        }

        spec.name.serialize(cursor, version);
        spec.col_type.serialize(cursor, version);
    }
}

fn read_col_specs(
    cursor: &mut Cursor<&[u8]>,
    count: CInt,
    global: bool,
    version: Version,
) -> error::Result<(Option<TableSpec>, Vec<ColSpec>)> {
    let global_table_spec = global
        .then(|| TableSpec::from_cursor(cursor, version))
        .transpose()?;

    let col_specs = (0..count)
        .map(|_| {
            let table_spec = match &global_table_spec {
                Some(table_spec) => table_spec.clone(),
                None => TableSpec::from_cursor(cursor, version)?,
            };

            Ok(ColSpec {
                table_spec,
                name: String::from_cursor(cursor, version)?,
                col_type: ColumnType::from_cursor(cursor, version)?,
            })
        })
        .collect::<error::Result<_>>()?;

    Ok((global_table_spec, col_specs))
}

#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash, Default)]
pub struct TableSpec {
    pub keyspace: String,
    pub table: String,
}

impl TableSpec {
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        TableSpec {
            keyspace: keyspace.into(),
            table: table.into(),
        }
    }
}

impl Serialize for TableSpec {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.keyspace.serialize(cursor, version);
        self.table.serialize(cursor, version);
    }
}

impl FromCursor for TableSpec {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        Ok(TableSpec {
            keyspace: String::from_cursor(cursor, version)?,
            table: String::from_cursor(cursor, version)?,
        })
    }
}

/// Name and type of a single column. The table spec is sent per column only when the metadata
/// has no global one; decoding fills it in either way.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash)]
pub struct ColSpec {
    pub table_spec: TableSpec,
    pub name: String,
    pub col_type: ColumnType,
}

macro_rules! col_types {
    ($($variant:ident = $code:literal,)+) => {
        /// Wire ids of column types.
        #[derive(Debug, Clone, Display, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
        pub enum ColType {
            $($variant,)+
        }

        impl From<ColType> for CIntShort {
            fn from(id: ColType) -> Self {
                match id {
                    $(ColType::$variant => $code,)+
                }
            }
        }

        impl TryFrom<CIntShort> for ColType {
            type Error = Error;

            fn try_from(code: CIntShort) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(ColType::$variant),)+
                    _ => Err(Error::UnexpectedColumnType(code)),
                }
            }
        }
    };
}

col_types! {
    Custom = 0x0000,
    Ascii = 0x0001,
    Bigint = 0x0002,
    Blob = 0x0003,
    Boolean = 0x0004,
    Counter = 0x0005,
    Decimal = 0x0006,
    Double = 0x0007,
    Float = 0x0008,
    Int = 0x0009,
    Text = 0x000A,
    Timestamp = 0x000B,
    Uuid = 0x000C,
    Varchar = 0x000D,
    Varint = 0x000E,
    Timeuuid = 0x000F,
    Inet = 0x0010,
    Date = 0x0011,
    Time = 0x0012,
    Smallint = 0x0013,
    Tinyint = 0x0014,
    Duration = 0x0015,
    List = 0x0020,
    Map = 0x0021,
    Set = 0x0022,
    Udt = 0x0030,
    Tuple = 0x0031,
}

/// Full type of a column: a native type or a parameterized one with its element types.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash)]
pub enum ColumnType {
    /// Any type without parameters.
    Native(ColType),
    /// Server-side class name.
    Custom(String),
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
    Udt(UdtType),
    Tuple(Vec<ColumnType>),
}

impl ColumnType {
    pub fn id(&self) -> ColType {
        match self {
            ColumnType::Native(id) => *id,
            ColumnType::Custom(_) => ColType::Custom,
            ColumnType::List(_) => ColType::List,
            ColumnType::Set(_) => ColType::Set,
            ColumnType::Map(..) => ColType::Map,
            ColumnType::Udt(_) => ColType::Udt,
            ColumnType::Tuple(_) => ColType::Tuple,
        }
    }

    /// Element type of a list or a set.
    pub fn element_type(&self) -> Option<&ColumnType> {
        match self {
            ColumnType::List(element) | ColumnType::Set(element) => Some(element),
            _ => None,
        }
    }
}

impl Serialize for ColumnType {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        CIntShort::from(self.id()).serialize(cursor, version);

        match self {
            ColumnType::Native(_) => {}
            ColumnType::Custom(class) => class.serialize(cursor, version),
            ColumnType::List(element) | ColumnType::Set(element) => {
                element.serialize(cursor, version)
            }
            ColumnType::Map(key, value) => {
                key.serialize(cursor, version);
                value.serialize(cursor, version);
            }
            ColumnType::Udt(udt) => udt.serialize(cursor, version),
            ColumnType::Tuple(types) => {
                (types.len() as u16).serialize(cursor, version);
                for element in types {
                    element.serialize(cursor, version);
                }
            }
        }
    }
}

impl FromCursor for ColumnType {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<ColumnType> {
        fn element(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Box<ColumnType>> {
            ColumnType::from_cursor(cursor, version).map(Box::new)
        }

        Ok(match ColType::try_from(CIntShort::from_cursor(cursor, version)?)? {
            ColType::Custom => ColumnType::Custom(String::from_cursor(cursor, version)?),
            ColType::List => ColumnType::List(element(cursor, version)?),
            ColType::Set => ColumnType::Set(element(cursor, version)?),
            ColType::Map => ColumnType::Map(element(cursor, version)?, element(cursor, version)?),
            ColType::Udt => ColumnType::Udt(UdtType::from_cursor(cursor, version)?),
            ColType::Tuple => {
                let count = u16::from_cursor(cursor, version)?;
                ColumnType::Tuple(
                    (0..count)
                        .map(|_| ColumnType::from_cursor(cursor, version))
                        .collect::<error::Result<_>>()?,
                )
            }
            id => ColumnType::Native(id),
        })
    }
}

/// User defined type with its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash)]
pub struct UdtType {
    pub keyspace: String,
    pub name: String,
    pub fields: Vec<(String, ColumnType)>,
}

impl Serialize for UdtType {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.keyspace.serialize(cursor, version);
        self.name.serialize(cursor, version);
        (self.fields.len() as u16).serialize(cursor, version);

        for (name, field_type) in &self.fields {
            name.serialize(cursor, version);
            field_type.serialize(cursor, version);
        }
    }
}

impl FromCursor for UdtType {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<UdtType> {
        let keyspace = String::from_cursor(cursor, version)?;
        let name = String::from_cursor(cursor, version)?;
        let count = u16::from_cursor(cursor, version)?;

        let fields = (0..count)
            .map(|_| {
                Ok((
                    String::from_cursor(cursor, version)?,
                    ColumnType::from_cursor(cursor, version)?,
                ))
            })
            .collect::<error::Result<_>>()?;

        Ok(UdtType {
            keyspace,
            name,
            fields,
        })
    }
}

/// Result of a PREPARE request.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct BodyResResultPrepared {
    pub id: CBytesShort,
    /// V5 only.
    pub result_metadata_id: Option<CBytesShort>,
    pub metadata: PreparedMetadata,
    /// Metadata of the rows executions will return. Absent on V1.
    pub result_metadata: Option<RowsMetadata>,
}

impl Serialize for BodyResResultPrepared {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.id.serialize(cursor, version);

        if version >= Version::V5 {
            match &self.result_metadata_id {
                Some(id) => id.serialize(cursor, version),
                None => CBytesShort::new(vec![]).serialize(cursor, version),
            }
        }

        self.metadata.serialize(cursor, version);

        if version >= Version::V2 {
            match &self.result_metadata {
                Some(metadata) => metadata.serialize(cursor, version),
                None => RowsMetadata::without_columns().serialize(cursor, version),
            }
        }
    }
}

impl FromCursor for BodyResResultPrepared {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let id = CBytesShort::from_cursor(cursor, version)?;
        let result_metadata_id = (version >= Version::V5)
            .then(|| CBytesShort::from_cursor(cursor, version))
            .transpose()?;
        let metadata = PreparedMetadata::from_cursor(cursor, version)?;
        let result_metadata = (version >= Version::V2)
            .then(|| RowsMetadata::from_cursor(cursor, version))
            .transpose()?;

        Ok(BodyResResultPrepared {
            id,
            result_metadata_id,
            metadata,
            result_metadata,
        })
    }
}

/// Bind markers of a prepared statement.
#[derive(Debug, Clone, PartialEq, Ord, PartialOrd, Eq, Hash, Default)]
pub struct PreparedMetadata {
    /// Positions of the partition key columns among the bind markers (V4+).
    pub pk_indexes: Vec<CIntShort>,
    pub global_table_spec: Option<TableSpec>,
    pub col_specs: Vec<ColSpec>,
}

impl Serialize for PreparedMetadata {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        let flags = if self.global_table_spec.is_some() {
            MetadataFlags::GLOBAL_TABLE_SPEC
        } else {
            MetadataFlags::empty()
        };

        flags.bits().serialize(cursor, version);
        (self.col_specs.len() as CInt).serialize(cursor, version);

        if version >= Version::V4 {
            (self.pk_indexes.len() as CInt).serialize(cursor, version);
            for index in &self.pk_indexes {
                index.serialize(cursor, version);
            }
        }

        write_col_specs(&self.global_table_spec, &self.col_specs, cursor, version);
    }
}

impl FromCursor for PreparedMetadata {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let flags = MetadataFlags::from_bits_truncate(CInt::from_cursor(cursor, version)?);
        let columns_count = CInt::from_cursor(cursor, version)?;

        let pk_count = if version >= Version::V4 {
            CInt::from_cursor(cursor, version)?
        } else {
            0
        };

        let pk_indexes = (0..pk_count)
            .map(|_| CIntShort::from_cursor(cursor, version))
            .collect::<error::Result<_>>()?;

        let (global_table_spec, col_specs) = read_col_specs(
            cursor,
            columns_count,
            flags.contains(MetadataFlags::GLOBAL_TABLE_SPEC),
            version,
        )?;

        Ok(PreparedMetadata {
            pk_indexes,
            global_table_spec,
            col_specs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_codec(bytes: &[u8], expected: ResResultBody, version: Version) {
        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        assert_eq!(ResResultBody::from_cursor(&mut cursor, version).unwrap(), expected);
        assert_eq!(expected.serialize_to_vec(version), bytes);
    }

    fn column(name: &str, col_type: ColumnType) -> ColSpec {
        ColSpec {
            table_spec: TableSpec::new("ks", "tb"),
            name: name.into(),
            col_type,
        }
    }

    #[test]
    fn should_encode_void_and_set_keyspace() {
        assert_codec(&[0, 0, 0, 1], ResResultBody::Void, Version::V4);
        assert_codec(
            &[0, 0, 0, 3, 0, 2, b'k', b's'],
            ResResultBody::SetKeyspace(BodyResResultSetKeyspace {
                keyspace: "ks".into(),
            }),
            Version::V3,
        );
    }

    #[test]
    fn should_reject_unknown_kind() {
        let mut cursor: Cursor<&[u8]> = Cursor::new(&[0, 0, 0, 9]);
        assert!(matches!(
            ResResultBody::from_cursor(&mut cursor, Version::V4),
            Err(Error::UnexpectedResultKind(9))
        ));
    }

    #[test]
    fn should_decode_rows_with_global_table_spec() {
        let bytes = &[
            0, 0, 0, 2, // rows
            0, 0, 0, 1, // global table spec
            0, 0, 0, 2, // columns
            0, 2, b'k', b's', 0, 2, b't', b'b', // ks.tb
            0, 2, b'i', b'd', 0, 9, // id int
            0, 4, b't', b'a', b'g', b's', 0, 0x20, 0, 0x0D, // tags list<varchar>
            0, 0, 0, 1, // one row
            0, 0, 0, 4, 0, 0, 0, 7, // id
            0xFF, 0xFF, 0xFF, 0xFF, // null tags
        ];

        let expected = ResResultBody::Rows(BodyResResultRows {
            metadata: RowsMetadata {
                columns_count: 2,
                global_table_spec: Some(TableSpec::new("ks", "tb")),
                col_specs: vec![
                    column("id", ColumnType::Native(ColType::Int)),
                    column(
                        "tags",
                        ColumnType::List(Box::new(ColumnType::Native(ColType::Varchar))),
                    ),
                ],
                ..Default::default()
            },
            rows: vec![vec![CBytes::new(vec![0, 0, 0, 7]), CBytes::new_empty()]],
            protocol_version: Version::V4,
        });

        assert_codec(bytes, expected, Version::V4);
    }

    #[test]
    fn should_decode_per_column_table_specs() {
        let bytes = &[
            0, 0, 0, 2, // rows
            0, 0, 0, 0, // no flags
            0, 0, 0, 1, // columns
            0, 2, b'k', b's', 0, 2, b't', b'b', 0, 1, b'v', 0, 2, // ks.tb.v bigint
            0, 0, 0, 0, // no rows
        ];

        let expected = ResResultBody::Rows(BodyResResultRows {
            metadata: RowsMetadata {
                columns_count: 1,
                col_specs: vec![column("v", ColumnType::Native(ColType::Bigint))],
                ..Default::default()
            },
            rows: vec![],
            protocol_version: Version::V4,
        });

        assert_codec(bytes, expected, Version::V4);
    }

    #[test]
    fn should_keep_paging_state_without_metadata() {
        let bytes = &[
            0, 0, 0, 2, // rows
            0, 0, 0, 6, // has more pages, no metadata
            0, 0, 0, 1, // columns
            0, 0, 0, 2, 0xAB, 0xCD, // paging state
            0, 0, 0, 0, // no rows
        ];

        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        let result = ResResultBody::from_cursor(&mut cursor, Version::V4).unwrap();
        let metadata = result.as_rows_metadata().unwrap();

        assert!(metadata.no_metadata);
        assert_eq!(metadata.paging_state, Some(CBytes::new(vec![0xAB, 0xCD])));
        assert!(metadata.col_specs.is_empty());
        assert_eq!(result.serialize_to_vec(Version::V4), bytes);
        assert_eq!(result.into_rows().unwrap().len(), 0);
    }

    #[test]
    fn should_read_new_metadata_id() {
        let bytes = &[
            0, 0, 0, 2, // rows
            0, 0, 0, 9, // metadata changed, global table spec
            0, 0, 0, 1, // columns
            0, 2, 1, 2, // new metadata id
            0, 2, b'k', b's', 0, 2, b't', b'b', // ks.tb
            0, 1, b'v', 0, 2, // v bigint
            0, 0, 0, 0, // no rows
        ];

        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        let result = ResResultBody::from_cursor(&mut cursor, Version::V5).unwrap();

        assert_eq!(
            result.as_rows_metadata().unwrap().new_metadata_id,
            Some(CBytesShort::new(vec![1, 2]))
        );
        assert_eq!(result.serialize_to_vec(Version::V5), bytes);
    }

    #[test]
    fn should_encode_prepared_with_pk_indexes_on_v4() {
        let bytes = &[
            0, 0, 0, 4, // prepared
            0, 2, 0xCA, 0xFE, // id
            0, 0, 0, 1, // global table spec
            0, 0, 0, 1, // columns
            0, 0, 0, 1, 0, 0, // pk index 0
            0, 2, b'k', b's', 0, 2, b't', b'b', // ks.tb
            0, 2, b'i', b'd', 0, 0x0C, // id uuid
            0, 0, 0, 4, 0, 0, 0, 0, // result without columns
        ];

        let expected = ResResultBody::Prepared(BodyResResultPrepared {
            id: CBytesShort::new(vec![0xCA, 0xFE]),
            result_metadata_id: None,
            metadata: PreparedMetadata {
                pk_indexes: vec![0],
                global_table_spec: Some(TableSpec::new("ks", "tb")),
                col_specs: vec![column("id", ColumnType::Native(ColType::Uuid))],
            },
            result_metadata: Some(RowsMetadata::without_columns()),
        });

        assert_codec(bytes, expected, Version::V4);
    }

    #[test]
    fn should_skip_result_metadata_on_v1() {
        let bytes = &[
            0, 0, 0, 4, // prepared
            0, 1, 1, // id
            0, 0, 0, 0, // no flags
            0, 0, 0, 0, // no columns
        ];

        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        let prepared = ResResultBody::from_cursor(&mut cursor, Version::V1)
            .unwrap()
            .into_prepared()
            .unwrap();

        assert_eq!(prepared.id, CBytesShort::new(vec![1]));
        assert!(prepared.result_metadata.is_none());
        assert!(prepared.metadata.pk_indexes.is_empty());
    }

    #[test]
    fn should_decode_nested_column_types() {
        let bytes = &[
            0, 0x21, // map
            0, 0x0D, // varchar key
            0, 0x31, 0, 2, // tuple of two
            0, 0x09, // int
            0, 0x30, // udt
            0, 3, b'b', b'a', b'r', 0, 3, b'f', b'o', b'o', // bar.foo
            0, 1, 0, 1, b'x', 0, 0x22, 0, 0x03, // x set<blob>
        ];

        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        let col_type = ColumnType::from_cursor(&mut cursor, Version::V4).unwrap();

        let udt = ColumnType::Udt(UdtType {
            keyspace: "bar".into(),
            name: "foo".into(),
            fields: vec![(
                "x".into(),
                ColumnType::Set(Box::new(ColumnType::Native(ColType::Blob))),
            )],
        });
        assert_eq!(
            col_type,
            ColumnType::Map(
                Box::new(ColumnType::Native(ColType::Varchar)),
                Box::new(ColumnType::Tuple(vec![
                    ColumnType::Native(ColType::Int),
                    udt
                ])),
            )
        );
        assert_eq!(col_type.id(), ColType::Map);
        assert_eq!(col_type.serialize_to_vec(Version::V4), bytes.to_vec());
    }
}
