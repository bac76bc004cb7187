use std::convert::TryFrom;
use std::io::Cursor;

use derive_more::{Constructor, Display};

use crate::consistency::Consistency;
use crate::frame::{FromCursor, ProtocolFeature, Serialize, Version};
use crate::query::{QueryFlags, QueryValues};
use crate::types::{
    check_short_len, from_cursor_str, from_cursor_str_long, serialize_str, serialize_str_long,
    CBytesShort, CInt, CLong,
};
use crate::{error, Error};

/// BATCH body. V2 ends after the consistency; V3+ appends flags and the optional fields they
/// announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyReqBatch {
    pub batch_type: BatchType,
    pub queries: Vec<BatchQuery>,
    pub consistency: Consistency,
    pub serial_consistency: Option<Consistency>,
    /// Default timestamp in microseconds since epoch.
    pub timestamp: Option<CLong>,
    pub keyspace: Option<String>,
    pub now_in_seconds: Option<CInt>,
    /// Requests server-side tracing through the frame header.
    pub tracing: bool,
}

impl BodyReqBatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        batch_type: BatchType,
        queries: Vec<BatchQuery>,
        consistency: Consistency,
        serial_consistency: Option<Consistency>,
        timestamp: Option<CLong>,
        keyspace: Option<String>,
        now_in_seconds: Option<CInt>,
    ) -> BodyReqBatch {
        BodyReqBatch {
            batch_type,
            queries,
            consistency,
            serial_consistency,
            timestamp,
            keyspace,
            now_in_seconds,
            tracing: false,
        }
    }

    fn flags(&self) -> QueryFlags {
        let mut flags = QueryFlags::empty();
        flags.set(
            QueryFlags::WITH_SERIAL_CONSISTENCY,
            self.serial_consistency.is_some(),
        );
        flags.set(QueryFlags::WITH_DEFAULT_TIMESTAMP, self.timestamp.is_some());
        flags.set(QueryFlags::WITH_KEYSPACE, self.keyspace.is_some());
        flags.set(QueryFlags::WITH_NOW_IN_SECONDS, self.now_in_seconds.is_some());
        flags
    }

    pub fn check_version(&self, version: Version) -> error::Result<()> {
        version.check(ProtocolFeature::Batch)?;
        check_short_len(self.queries.len(), "Batch statement count")?;

        for query in &self.queries {
            if query.values.has_names() {
                return Err(Error::InvalidArgument(
                    "Named values cannot be used in batches".into(),
                ));
            }

            query.values.check_version(version)?;
        }

        if let Some(serial_consistency) = self.serial_consistency {
            version.check(ProtocolFeature::BatchFlags)?;
            serial_consistency.check_serial()?;
        }

        if self.timestamp.is_some() {
            version.check(ProtocolFeature::DefaultTimestamp)?;
        }

        if self.keyspace.is_some() {
            version.check(ProtocolFeature::KeyspaceInRequest)?;
        }

        if self.now_in_seconds.is_some() {
            version.check(ProtocolFeature::NowInSeconds)?;
        }

        Ok(())
    }
}

impl Serialize for BodyReqBatch {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        u8::from(self.batch_type).serialize(cursor, version);
        (self.queries.len() as u16).serialize(cursor, version);

        for query in &self.queries {
            query.serialize(cursor, version);
        }

        self.consistency.serialize(cursor, version);

        if version < Version::V3 {
            return;
        }

        self.flags().serialize(cursor, version);

        if let Some(serial_consistency) = self.serial_consistency {
            serial_consistency.serialize(cursor, version);
        }

        if let Some(timestamp) = self.timestamp {
            timestamp.serialize(cursor, version);
        }

        if let Some(keyspace) = &self.keyspace {
            serialize_str(cursor, keyspace, version);
        }

        if let Some(now_in_seconds) = self.now_in_seconds {
            now_in_seconds.serialize(cursor, version);
        }
    }
}

impl FromCursor for BodyReqBatch {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let batch_type = BatchType::try_from(u8::from_cursor(cursor, version)?)?;
        let len = u16::from_cursor(cursor, version)?;

        let mut queries = Vec::with_capacity(len as usize);
        for _ in 0..len {
            queries.push(BatchQuery::from_cursor(cursor, version)?);
        }

        let consistency = Consistency::from_cursor(cursor, version)?;
        let flags = if version >= Version::V3 {
            QueryFlags::from_cursor(cursor, version)?
        } else {
            QueryFlags::empty()
        };

        let serial_consistency = if flags.contains(QueryFlags::WITH_SERIAL_CONSISTENCY) {
            Some(Consistency::from_cursor(cursor, version)?)
        } else {
            None
        };

        let timestamp = if flags.contains(QueryFlags::WITH_DEFAULT_TIMESTAMP) {
            Some(CLong::from_cursor(cursor, version)?)
        } else {
            None
        };

        let keyspace = if flags.contains(QueryFlags::WITH_KEYSPACE) {
            Some(from_cursor_str(cursor)?.to_string())
        } else {
            None
        };

        let now_in_seconds = if flags.contains(QueryFlags::WITH_NOW_IN_SECONDS) {
            Some(CInt::from_cursor(cursor, version)?)
        } else {
            None
        };

        Ok(BodyReqBatch::new(
            batch_type,
            queries,
            consistency,
            serial_consistency,
            timestamp,
            keyspace,
            now_in_seconds,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash, Display, Default)]
pub enum BatchType {
    /// Atomic batch, written to the batch log first.
    #[default]
    Logged,
    Unlogged,
    /// Counter updates only.
    Counter,
}

impl TryFrom<u8> for BatchType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BatchType::Logged),
            1 => Ok(BatchType::Unlogged),
            2 => Ok(BatchType::Counter),
            _ => Err(Error::General(format!("Unknown batch type: {value}"))),
        }
    }
}

impl From<BatchType> for u8 {
    fn from(value: BatchType) -> Self {
        match value {
            BatchType::Logged => 0,
            BatchType::Unlogged => 1,
            BatchType::Counter => 2,
        }
    }
}

/// Either a prepared statement id or a query string.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum BatchQuerySubj {
    PreparedId(CBytesShort),
    QueryString(String),
}

/// Single statement of a batch with its positional values.
#[derive(Debug, Clone, Constructor, PartialEq, Eq)]
pub struct BatchQuery {
    pub subject: BatchQuerySubj,
    pub values: QueryValues,
}

impl Serialize for BatchQuery {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match &self.subject {
            BatchQuerySubj::QueryString(query) => {
                0u8.serialize(cursor, version);
                serialize_str_long(cursor, query, version);
            }
            BatchQuerySubj::PreparedId(id) => {
                1u8.serialize(cursor, version);
                id.serialize(cursor, version);
            }
        }

        (self.values.len() as u16).serialize(cursor, version);
        self.values.serialize(cursor, version);
    }
}

impl FromCursor for BatchQuery {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<BatchQuery> {
        let subject = match u8::from_cursor(cursor, version)? {
            0 => BatchQuerySubj::QueryString(from_cursor_str_long(cursor)?.to_string()),
            1 => BatchQuerySubj::PreparedId(CBytesShort::from_cursor(cursor, version)?),
            kind => {
                return Err(Error::General(format!(
                    "Unknown batch query kind: {kind}"
                )))
            }
        };

        let count = u16::from_cursor(cursor, version)?;
        let values = QueryValues::from_cursor_with_count(cursor, count, false, version)?;

        Ok(BatchQuery::new(subject, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::Value;

    fn batch() -> BodyReqBatch {
        BodyReqBatch::new(
            BatchType::Unlogged,
            vec![
                BatchQuery::new(
                    BatchQuerySubj::QueryString("I".into()),
                    QueryValues::SimpleValues(vec![Value::new(1i32)]),
                ),
                BatchQuery::new(
                    BatchQuerySubj::PreparedId(CBytesShort::new(vec![7, 7])),
                    QueryValues::SimpleValues(vec![]),
                ),
            ],
            Consistency::Quorum,
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn should_encode_v2_batch_without_flags() {
        assert_eq!(
            batch().serialize_to_vec(Version::V2),
            vec![
                1, // unlogged
                0, 2, // two statements
                0, 0, 0, 0, 1, b'I', // query string
                0, 1, 0, 0, 0, 4, 0, 0, 0, 1, // one value
                1, 0, 2, 7, 7, // prepared id
                0, 0, // no values
                0, 4, // quorum
            ]
        );
    }

    #[test]
    fn should_round_trip_v3_and_v5_batches() {
        let mut body = batch();
        body.serial_consistency = Some(Consistency::LocalSerial);
        body.timestamp = Some(42);

        let bytes = body.serialize_to_vec(Version::V3);
        assert_eq!(&bytes[bytes.len() - 11..], &[0x30, 0, 9, 0, 0, 0, 0, 0, 0, 0, 42]);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(BodyReqBatch::from_cursor(&mut cursor, Version::V3).unwrap(), body);

        body.keyspace = Some("ks".into());
        body.now_in_seconds = Some(3);
        let bytes = body.serialize_to_vec(Version::V5);
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(BodyReqBatch::from_cursor(&mut cursor, Version::V5).unwrap(), body);
    }

    #[test]
    fn should_gate_batch_features() {
        let body = batch();
        assert!(matches!(
            body.check_version(Version::V1),
            Err(Error::UnsupportedFeature {
                feature: ProtocolFeature::Batch,
                ..
            })
        ));
        assert!(body.check_version(Version::V2).is_ok());

        let mut serial = batch();
        serial.serial_consistency = Some(Consistency::Serial);
        assert!(serial.check_version(Version::V2).is_err());
        assert!(serial.check_version(Version::V3).is_ok());

        serial.serial_consistency = Some(Consistency::One);
        assert!(matches!(
            serial.check_version(Version::V3),
            Err(Error::NotSerialConsistency(Consistency::One))
        ));
    }

    #[test]
    fn should_keep_statement_counts_above_i16_max() {
        let mut body = batch();
        body.queries = vec![body.queries[1].clone(); 40_000];
        assert!(body.check_version(Version::V3).is_ok());

        let bytes = body.serialize_to_vec(Version::V3);
        assert_eq!(&bytes[1..3], &[0x9C, 0x40]);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        let decoded = BodyReqBatch::from_cursor(&mut cursor, Version::V3).unwrap();
        assert_eq!(decoded.queries.len(), 40_000);

        body.queries.resize(65_536, body.queries[0].clone());
        assert!(matches!(
            body.check_version(Version::V3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn should_reject_named_values() {
        let mut body = batch();
        body.queries[0].values = QueryValues::NamedValues(vec![("a".into(), Value::Null)]);

        assert!(matches!(
            body.check_version(Version::V4),
            Err(Error::InvalidArgument(_))
        ));
    }
}
