use std::io::Cursor;

use bitflags::bitflags;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};

bitflags! {
    /// Flags of `<query_parameters>`. Sent as a byte before V5 and as an int afterwards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueryFlags: u32 {
        const VALUE = 0x01;
        const SKIP_METADATA = 0x02;
        const PAGE_SIZE = 0x04;
        const WITH_PAGING_STATE = 0x08;
        const WITH_SERIAL_CONSISTENCY = 0x10;
        const WITH_DEFAULT_TIMESTAMP = 0x20;
        const WITH_NAMES_FOR_VALUES = 0x40;
        const WITH_KEYSPACE = 0x80;
        const WITH_NOW_IN_SECONDS = 0x100;
    }
}

impl Serialize for QueryFlags {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        if version >= Version::V5 {
            self.bits().serialize(cursor, version);
        } else {
            (self.bits() as u8).serialize(cursor, version);
        }
    }
}

impl FromCursor for QueryFlags {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<QueryFlags> {
        let bits = if version >= Version::V5 {
            i32::from_cursor(cursor, version)? as u32
        } else {
            u8::from_cursor(cursor, version)? as u32
        };

        Ok(QueryFlags::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_widen_flags_on_v5() {
        let flags = QueryFlags::VALUE | QueryFlags::WITH_NOW_IN_SECONDS;

        assert_eq!(flags.serialize_to_vec(Version::V5), vec![0, 0, 1, 1]);
        assert_eq!(
            (QueryFlags::VALUE | QueryFlags::PAGE_SIZE).serialize_to_vec(Version::V4),
            vec![5]
        );

        let bytes = [0, 0, 1, 1];
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        assert_eq!(
            QueryFlags::from_cursor(&mut cursor, Version::V5).unwrap(),
            flags
        );
    }
}
