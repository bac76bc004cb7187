//! UUID helpers. Values travel in RFC 4122 byte order; identifiers produced by platforms that
//! store the first three fields little-endian (GUID layout) are converted with a fixed shuffle.

use std::io::{Cursor, Read};
use ::uuid::Uuid;

use crate::error::Result;
use crate::types::UUID_LEN;

/// Byte positions mapping GUID layout to RFC order. The mapping is its own inverse.
pub const GUID_SHUFFLE: [usize; UUID_LEN] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// Reorders GUID-layout bytes into RFC byte order.
pub fn guid_to_rfc_bytes(guid: &[u8; UUID_LEN]) -> [u8; UUID_LEN] {
    let mut rfc = [0; UUID_LEN];
    for (target, source) in GUID_SHUFFLE.iter().enumerate() {
        rfc[target] = guid[*source];
    }

    rfc
}

/// Reorders RFC bytes into GUID layout.
#[inline]
pub fn rfc_to_guid_bytes(rfc: &[u8; UUID_LEN]) -> [u8; UUID_LEN] {
    guid_to_rfc_bytes(rfc)
}

pub fn from_cursor_uuid(cursor: &mut Cursor<&[u8]>) -> Result<Uuid> {
    let mut buff = [0; UUID_LEN];
    cursor.read_exact(&mut buff)?;

    Ok(Uuid::from_bytes(buff))
}

/// Checks if the value is a version 1 (time-based) UUID, as required by `timeuuid` columns.
#[inline]
pub fn is_time_uuid(value: &Uuid) -> bool {
    value.get_version_num() == 1
}
