use std::io::Cursor;

use derive_more::Constructor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::CBytes;

/// SASL token sent in reply to AUTHENTICATE or AUTH_CHALLENGE.
#[derive(Debug, Constructor, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct BodyReqAuthResponse {
    pub data: CBytes,
}

impl BodyReqAuthResponse {
    /// Token understood by `PasswordAuthenticator`: `\0username\0password`.
    pub fn plain_text(username: &str, password: &str) -> BodyReqAuthResponse {
        let mut token = Vec::with_capacity(username.len() + password.len() + 2);
        token.push(0);
        token.extend_from_slice(username.as_bytes());
        token.push(0);
        token.extend_from_slice(password.as_bytes());

        BodyReqAuthResponse::new(CBytes::new(token))
    }
}

impl Serialize for BodyReqAuthResponse {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.data.serialize(cursor, version);
    }
}

impl FromCursor for BodyReqAuthResponse {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        CBytes::from_cursor(cursor, version).map(BodyReqAuthResponse::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_plain_text_token() {
        let body = BodyReqAuthResponse::plain_text("user", "pw");
        assert_eq!(
            body.serialize_to_vec(Version::V4),
            vec![0, 0, 0, 8, 0, b'u', b's', b'e', b'r', 0, b'p', b'w']
        );
    }
}
