use std::io::Cursor;

use crate::consistency::Consistency;
use crate::error;
use crate::frame::{FromCursor, ProtocolFeature, Serialize, Version};
use crate::query::query_flags::QueryFlags;
use crate::query::query_values::QueryValues;
use crate::types::{from_cursor_str, serialize_str, CBytes, CInt, CLong};

/// `<query_parameters>` of QUERY and EXECUTE requests. Only the fields which are set end up on
/// the wire; each of them is checked against the negotiated version first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub consistency: Consistency,
    pub values: Option<QueryValues>,
    /// Asks the server to omit result metadata, for prepared statements with cached metadata.
    pub skip_metadata: bool,
    pub page_size: Option<CInt>,
    pub paging_state: Option<CBytes>,
    pub serial_consistency: Option<Consistency>,
    /// Default timestamp in microseconds since epoch.
    pub timestamp: Option<CLong>,
    pub keyspace: Option<String>,
    pub now_in_seconds: Option<CInt>,
    /// Requests server-side tracing. Travels as a frame header flag, not in the body.
    pub tracing: bool,
}

impl QueryParams {
    pub fn flags(&self) -> QueryFlags {
        let mut flags = QueryFlags::empty();

        if let Some(values) = &self.values {
            flags.insert(QueryFlags::VALUE);

            if values.has_names() {
                flags.insert(QueryFlags::WITH_NAMES_FOR_VALUES);
            }
        }

        flags.set(QueryFlags::SKIP_METADATA, self.skip_metadata);
        flags.set(QueryFlags::PAGE_SIZE, self.page_size.is_some());
        flags.set(QueryFlags::WITH_PAGING_STATE, self.paging_state.is_some());
        flags.set(
            QueryFlags::WITH_SERIAL_CONSISTENCY,
            self.serial_consistency.is_some(),
        );
        flags.set(QueryFlags::WITH_DEFAULT_TIMESTAMP, self.timestamp.is_some());
        flags.set(QueryFlags::WITH_KEYSPACE, self.keyspace.is_some());
        flags.set(QueryFlags::WITH_NOW_IN_SECONDS, self.now_in_seconds.is_some());

        flags
    }

    /// Fails with the first field the version cannot encode, or with
    /// [`error::Error::NotSerialConsistency`] for a non-serial serial consistency.
    pub fn check_version(&self, version: Version) -> error::Result<()> {
        if let Some(values) = &self.values {
            values.check_version(version)?;
        }

        if let Some(serial_consistency) = self.serial_consistency {
            version.check(ProtocolFeature::SerialConsistency)?;
            serial_consistency.check_serial()?;
        }

        if self.page_size.is_some() || self.paging_state.is_some() {
            version.check(ProtocolFeature::Paging)?;
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

    /// Serializes values prefixed with their count; an absent value list is written as zero
    /// values. Used by the V1 layouts, which have no flags.
    pub fn serialize_values(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match &self.values {
            Some(values) => {
                (values.len() as u16).serialize(cursor, version);
                values.serialize(cursor, version);
            }
            None => 0u16.serialize(cursor, version),
        }
    }
}

/// V2+ layout. V1 requests have no parameter block and serialize their fields themselves.
impl Serialize for QueryParams {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.consistency.serialize(cursor, version);
        self.flags().serialize(cursor, version);

        if let Some(values) = &self.values {
            (values.len() as u16).serialize(cursor, version);
            values.serialize(cursor, version);
        }

        if let Some(page_size) = self.page_size {
            page_size.serialize(cursor, version);
        }

        if let Some(paging_state) = &self.paging_state {
            paging_state.serialize(cursor, version);
        }

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

impl FromCursor for QueryParams {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<QueryParams> {
        let consistency = Consistency::from_cursor(cursor, version)?;
        let flags = QueryFlags::from_cursor(cursor, version)?;

        let values = if flags.contains(QueryFlags::VALUE) {
            let count = u16::from_cursor(cursor, version)?;
            Some(QueryValues::from_cursor_with_count(
                cursor,
                count,
                flags.contains(QueryFlags::WITH_NAMES_FOR_VALUES),
                version,
            )?)
        } else {
            None
        };

        let page_size = if flags.contains(QueryFlags::PAGE_SIZE) {
            Some(CInt::from_cursor(cursor, version)?)
        } else {
            None
        };

        let paging_state = if flags.contains(QueryFlags::WITH_PAGING_STATE) {
            Some(CBytes::from_cursor(cursor, version)?)
        } else {
            None
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

        Ok(QueryParams {
            consistency,
            values,
            skip_metadata: flags.contains(QueryFlags::SKIP_METADATA),
            page_size,
            paging_state,
            serial_consistency,
            timestamp,
            keyspace,
            now_in_seconds,
            tracing: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::Value;

    #[test]
    fn should_serialize_v4_params() {
        let params = QueryParams {
            consistency: Consistency::Quorum,
            values: Some(QueryValues::SimpleValues(vec![Value::new(7i32)])),
            page_size: Some(100),
            timestamp: Some(1_000_000),
            ..Default::default()
        };

        assert_eq!(
            params.serialize_to_vec(Version::V4),
            vec![
                0, 4, // quorum
                0x25, // flags
                0, 1, 0, 0, 0, 4, 0, 0, 0, 7, // values
                0, 0, 0, 100, // page size
                0, 0, 0, 0, 0, 0x0F, 0x42, 0x40, // timestamp
            ]
        );
    }

    #[test]
    fn should_serialize_v5_keyspace() {
        let params = QueryParams {
            consistency: Consistency::One,
            keyspace: Some("ks".into()),
            now_in_seconds: Some(5),
            ..Default::default()
        };

        let bytes = params.serialize_to_vec(Version::V5);
        assert_eq!(
            bytes,
            vec![0, 1, 0, 0, 1, 0x80, 0, 2, b'k', b's', 0, 0, 0, 5]
        );

        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(
            QueryParams::from_cursor(&mut cursor, Version::V5).unwrap(),
            params
        );
    }

    #[test]
    fn should_check_version_per_field() {
        let paging = QueryParams {
            page_size: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            paging.check_version(Version::V1),
            Err(error::Error::UnsupportedFeature {
                feature: ProtocolFeature::Paging,
                ..
            })
        ));
        assert!(paging.check_version(Version::V2).is_ok());

        let keyspace = QueryParams {
            keyspace: Some("ks".into()),
            ..Default::default()
        };
        assert!(keyspace.check_version(Version::V4).is_err());
        assert!(keyspace.check_version(Version::V5).is_ok());
    }

    #[test]
    fn should_reject_regular_serial_consistency() {
        let params = QueryParams {
            serial_consistency: Some(Consistency::Quorum),
            ..Default::default()
        };

        assert!(matches!(
            params.check_version(Version::V4),
            Err(error::Error::NotSerialConsistency(Consistency::Quorum))
        ));
    }

    #[test]
    fn should_read_skip_metadata_flag() {
        let params = QueryParams {
            skip_metadata: true,
            paging_state: Some(CBytes::new(vec![1, 2])),
            ..Default::default()
        };
        let bytes = params.serialize_to_vec(Version::V3);
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        assert_eq!(
            QueryParams::from_cursor(&mut cursor, Version::V3).unwrap(),
            params
        );
    }
}
