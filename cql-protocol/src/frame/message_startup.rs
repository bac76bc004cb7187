use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{from_cursor_str, serialize_str_map, CIntShort};

pub const CQL_VERSION: &str = "CQL_VERSION";
pub const CQL_VERSION_VAL: &str = "3.0.0";
pub const COMPRESSION: &str = "COMPRESSION";
pub const DRIVER_NAME: &str = "DRIVER_NAME";
pub const DRIVER_VERSION: &str = "DRIVER_VERSION";

/// STARTUP options as an ordered string map.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BodyReqStartup {
    pub options: Vec<(String, String)>,
}

impl BodyReqStartup {
    pub fn new(compression: Option<&str>) -> BodyReqStartup {
        let mut options = vec![
            (CQL_VERSION.to_string(), CQL_VERSION_VAL.to_string()),
            (DRIVER_NAME.to_string(), env!("CARGO_PKG_NAME").to_string()),
            (
                DRIVER_VERSION.to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            ),
        ];

        if let Some(compression) = compression {
            options.push((COMPRESSION.to_string(), compression.to_string()));
        }

        BodyReqStartup { options }
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl Default for BodyReqStartup {
    fn default() -> Self {
        BodyReqStartup::new(None)
    }
}

impl Serialize for BodyReqStartup {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str_map(
            cursor,
            self.options
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
            version,
        );
    }
}

impl FromCursor for BodyReqStartup {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<BodyReqStartup> {
        let count = CIntShort::from_cursor(cursor, version)?;
        let mut options = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let key = from_cursor_str(cursor)?.to_string();
            let value = from_cursor_str(cursor)?.to_string();
            options.push((key, value));
        }

        Ok(BodyReqStartup { options })
    }
}
