//! Authentication exchange: AUTHENTICATE names the authenticator, AUTH_CHALLENGE and
//! AUTH_SUCCESS carry SASL tokens.
use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{from_cursor_str, serialize_str, CBytes};

#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct BodyResAuthenticate {
    /// Fully qualified class name of the server authenticator.
    pub authenticator: String,
}

impl Serialize for BodyResAuthenticate {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str(cursor, &self.authenticator, version);
    }
}

impl FromCursor for BodyResAuthenticate {
    fn from_cursor(
        cursor: &mut Cursor<&[u8]>,
        _version: Version,
    ) -> error::Result<BodyResAuthenticate> {
        Ok(BodyResAuthenticate {
            authenticator: from_cursor_str(cursor)?.to_string(),
        })
    }
}

#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct BodyResAuthChallenge {
    pub data: CBytes,
}

impl Serialize for BodyResAuthChallenge {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.data.serialize(cursor, version);
    }
}

impl FromCursor for BodyResAuthChallenge {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        CBytes::from_cursor(cursor, version).map(|data| BodyResAuthChallenge { data })
    }
}

#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone, Default)]
pub struct BodyResAuthSuccess {
    pub data: CBytes,
}

impl Serialize for BodyResAuthSuccess {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.data.serialize(cursor, version);
    }
}

impl FromCursor for BodyResAuthSuccess {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        CBytes::from_cursor(cursor, version).map(|data| BodyResAuthSuccess { data })
    }
}
