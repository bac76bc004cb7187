use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{from_cursor_str, serialize_str_map, CIntShort};

/// V1 CREDENTIALS: a string map handed to the server's authenticator.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BodyReqCredentials {
    pub credentials: Vec<(String, String)>,
}

impl BodyReqCredentials {
    pub fn plain_text(username: &str, password: &str) -> BodyReqCredentials {
        BodyReqCredentials {
            credentials: vec![
                ("username".to_string(), username.to_string()),
                ("password".to_string(), password.to_string()),
            ],
        }
    }
}

impl Serialize for BodyReqCredentials {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str_map(
            cursor,
            self.credentials
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
            version,
        );
    }
}

impl FromCursor for BodyReqCredentials {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let count = CIntShort::from_cursor(cursor, version)?;
        let mut credentials = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let key = from_cursor_str(cursor)?.to_string();
            let value = from_cursor_str(cursor)?.to_string();
            credentials.push((key, value));
        }

        Ok(BodyReqCredentials { credentials })
    }
}
