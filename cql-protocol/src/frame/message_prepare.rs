use std::io::Cursor;

use bitflags::bitflags;

use crate::error;
use crate::frame::{FromCursor, ProtocolFeature, Serialize, Version};
use crate::types::{from_cursor_str, from_cursor_str_long, serialize_str, serialize_str_long};

bitflags! {
    /// PREPARE flags, present on V5 only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrepareFlags: u32 {
        const WITH_KEYSPACE = 0x01;
    }
}

/// PREPARE body. The keyspace is sent only on V5.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Default)]
pub struct BodyReqPrepare {
    pub query: String,
    pub keyspace: Option<String>,
}

impl BodyReqPrepare {
    #[inline]
    pub fn new(query: String, keyspace: Option<String>) -> BodyReqPrepare {
        BodyReqPrepare { query, keyspace }
    }

    pub fn check_version(&self, version: Version) -> error::Result<()> {
        if self.keyspace.is_some() {
            version.check(ProtocolFeature::KeyspaceInRequest)?;
        }

        Ok(())
    }
}

impl Serialize for BodyReqPrepare {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str_long(cursor, &self.query, version);

        if version >= Version::V5 {
            match &self.keyspace {
                Some(keyspace) => {
                    PrepareFlags::WITH_KEYSPACE.bits().serialize(cursor, version);
                    serialize_str(cursor, keyspace, version);
                }
                None => PrepareFlags::empty().bits().serialize(cursor, version),
            }
        }
    }
}

impl FromCursor for BodyReqPrepare {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let query = from_cursor_str_long(cursor)?.to_string();
        if version < Version::V5 {
            return Ok(BodyReqPrepare::new(query, None));
        }

        let flags = PrepareFlags::from_bits_truncate(i32::from_cursor(cursor, version)? as u32);
        let keyspace = if flags.contains(PrepareFlags::WITH_KEYSPACE) {
            Some(from_cursor_str(cursor)?.to_string())
        } else {
            None
        };

        Ok(BodyReqPrepare::new(query, keyspace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_encode_plain_prepare() {
        let body = BodyReqPrepare::new("a".into(), None);
        assert_eq!(body.serialize_to_vec(Version::V4), vec![0, 0, 0, 1, b'a']);
        assert_eq!(
            body.serialize_to_vec(Version::V5),
            vec![0, 0, 0, 1, b'a', 0, 0, 0, 0]
        );
    }

    #[test]
    fn should_encode_keyspace_on_v5() {
        let body = BodyReqPrepare::new("a".into(), Some("k".into()));
        let bytes = body.serialize_to_vec(Version::V5);
        assert_eq!(bytes, vec![0, 0, 0, 1, b'a', 0, 0, 0, 1, 0, 1, b'k']);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(
            BodyReqPrepare::from_cursor(&mut cursor, Version::V5).unwrap(),
            body
        );

        assert!(body.check_version(Version::V4).is_err());
    }
}
