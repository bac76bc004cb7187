use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{from_cursor_string_multimap, serialize_str, serialize_str_list, CIntShort};

/// SUPPORTED options, in the order the server sent them.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BodyResSupported {
    pub data: Vec<(String, Vec<String>)>,
}

impl BodyResSupported {
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.data
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }
}

impl Serialize for BodyResSupported {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        (self.data.len() as CIntShort).serialize(cursor, version);
        for (key, values) in &self.data {
            serialize_str(cursor, key, version);
            serialize_str_list(cursor, values.iter().map(String::as_str), version);
        }
    }
}

impl FromCursor for BodyResSupported {
    fn from_cursor(
        cursor: &mut Cursor<&[u8]>,
        _version: Version,
    ) -> error::Result<BodyResSupported> {
        from_cursor_string_multimap(cursor).map(|data| BodyResSupported { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_supported_options() {
        let bytes = [
            0, 1, // one option
            0, 11, b'C', b'Q', b'L', b'_', b'V', b'E', b'R', b'S', b'I', b'O', b'N', //
            0, 2, // two values
            0, 5, b'3', b'.', b'0', b'.', b'0', //
            0, 5, b'3', b'.', b'4', b'.', b'5',
        ];
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
        let supported = BodyResSupported::from_cursor(&mut cursor, Version::V4).unwrap();

        assert_eq!(
            supported.get("CQL_VERSION"),
            Some(&["3.0.0".to_string(), "3.4.5".to_string()][..])
        );
        assert_eq!(supported.serialize_to_vec(Version::V4), bytes.to_vec());
    }
}
