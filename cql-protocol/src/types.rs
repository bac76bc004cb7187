use std::convert::TryInto;
use std::io::{self, Cursor, Read, Write};
use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::frame::{FromCursor, Serialize, Version};

pub const SHORT_LEN: usize = 2;
pub const INT_LEN: usize = 4;
pub const LONG_LEN: usize = 8;
pub const UUID_LEN: usize = 16;

const NULL_INT_LEN: CInt = -1;
const NULL_SHORT_LEN: CIntShort = -1;

pub mod blob;
pub mod collections;
pub mod decimal;
pub mod rows;
pub mod timestamp;
pub mod uuid;
pub mod value;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::blob::Blob;
    pub use crate::types::collections::CollectionValue;
    pub use crate::types::decimal::Decimal;
    pub use crate::types::rows::Row;
    pub use crate::types::value::{Bytes, Value};
}

#[inline]
fn convert_to_array<const S: usize>(bytes: &[u8]) -> std::result::Result<[u8; S], io::Error> {
    bytes
        .try_into()
        .map_err(|error| io::Error::new(io::ErrorKind::UnexpectedEof, error))
}

#[inline]
pub fn try_i64_from_bytes(bytes: &[u8]) -> std::result::Result<i64, io::Error> {
    Ok(i64::from_be_bytes(convert_to_array(bytes)?))
}

#[inline]
pub fn try_i32_from_bytes(bytes: &[u8]) -> std::result::Result<i32, io::Error> {
    Ok(i32::from_be_bytes(convert_to_array(bytes)?))
}

#[inline]
pub fn try_i16_from_bytes(bytes: &[u8]) -> std::result::Result<i16, io::Error> {
    Ok(i16::from_be_bytes(convert_to_array(bytes)?))
}

#[inline]
pub fn try_f32_from_bytes(bytes: &[u8]) -> std::result::Result<f32, io::Error> {
    Ok(f32::from_be_bytes(convert_to_array(bytes)?))
}

#[inline]
pub fn try_f64_from_bytes(bytes: &[u8]) -> std::result::Result<f64, io::Error> {
    Ok(f64::from_be_bytes(convert_to_array(bytes)?))
}

pub fn serialize_str(cursor: &mut Cursor<&mut Vec<u8>>, value: &str, version: Version) {
    let len = value.len() as CIntShort;
    len.serialize(cursor, version);
    let _ = cursor.write(value.as_bytes());
}

pub fn serialize_str_long(cursor: &mut Cursor<&mut Vec<u8>>, value: &str, version: Version) {
    let len = value.len() as CInt;
    len.serialize(cursor, version);
    let _ = cursor.write(value.as_bytes());
}

pub fn from_cursor_str<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a str> {
    let mut buff = [0; SHORT_LEN];
    cursor.read_exact(&mut buff)?;

    let len = u16::from_be_bytes(buff);
    let body_bytes = cursor_next_value_ref(cursor, len as usize)?;

    std::str::from_utf8(body_bytes).map_err(Into::into)
}

pub fn from_cursor_str_long<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a str> {
    let mut buff = [0; INT_LEN];
    cursor.read_exact(&mut buff)?;

    let len = CInt::from_be_bytes(buff);
    if len < 0 {
        return Err(Error::General(format!("Invalid long string length: {len}")));
    }

    let body_bytes = cursor_next_value_ref(cursor, len as usize)?;

    std::str::from_utf8(body_bytes).map_err(Into::into)
}

pub fn serialize_str_list<'a>(
    cursor: &mut Cursor<&mut Vec<u8>>,
    list: impl ExactSizeIterator<Item = &'a str>,
    version: Version,
) {
    let len = list.len() as CIntShort;
    len.serialize(cursor, version);

    for string in list {
        serialize_str(cursor, string, version);
    }
}

pub fn from_cursor_string_list(cursor: &mut Cursor<&[u8]>) -> Result<Vec<String>> {
    let mut buff = [0; SHORT_LEN];
    cursor.read_exact(&mut buff)?;

    let len = u16::from_be_bytes(buff);
    let mut list = Vec::with_capacity(len as usize);
    for _ in 0..len {
        list.push(from_cursor_str(cursor)?.to_string());
    }

    Ok(list)
}

/// Serializes a `[string map]` in the given entry order.
pub fn serialize_str_map<'a>(
    cursor: &mut Cursor<&mut Vec<u8>>,
    map: impl ExactSizeIterator<Item = (&'a str, &'a str)>,
    version: Version,
) {
    let len = map.len() as CIntShort;
    len.serialize(cursor, version);

    for (key, value) in map {
        serialize_str(cursor, key, version);
        serialize_str(cursor, value, version);
    }
}

/// Reads a `[string multimap]`, keeping the server's entry order.
pub fn from_cursor_string_multimap(cursor: &mut Cursor<&[u8]>) -> Result<Vec<(String, Vec<String>)>> {
    let mut buff = [0; SHORT_LEN];
    cursor.read_exact(&mut buff)?;

    let len = u16::from_be_bytes(buff);
    let mut map = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let key = from_cursor_str(cursor)?.to_string();
        let values = from_cursor_string_list(cursor)?;
        map.push((key, values));
    }

    Ok(map)
}

/// The structure that represents `[bytes]`, which may be null.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Ord, PartialOrd, Default)]
pub struct CBytes {
    bytes: Option<Vec<u8>>,
}

impl CBytes {
    #[inline]
    pub fn new(bytes: Vec<u8>) -> CBytes {
        CBytes { bytes: Some(bytes) }
    }

    /// Creates bytes that represent a null value
    #[inline]
    pub fn new_empty() -> CBytes {
        CBytes { bytes: None }
    }

    #[inline]
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.bytes {
            None => true,
            Some(bytes) => bytes.is_empty(),
        }
    }

    #[inline]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.bytes
    }
}

impl FromCursor for CBytes {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<CBytes> {
        let len = CInt::from_cursor(cursor, version)?;
        // null or not set value
        if len < 0 {
            return Ok(CBytes { bytes: None });
        }

        cursor_next_value(cursor, len as usize).map(CBytes::new)
    }
}

impl Serialize for CBytes {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match &self.bytes {
            Some(bytes) => {
                let len = bytes.len() as CInt;
                len.serialize(cursor, version);
                bytes.serialize(cursor, version);
            }
            None => NULL_INT_LEN.serialize(cursor, version),
        }
    }
}

/// `[short bytes]`, used for prepared statement ids.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default)]
pub struct CBytesShort {
    bytes: Option<Vec<u8>>,
}

impl CBytesShort {
    #[inline]
    pub fn new(bytes: Vec<u8>) -> CBytesShort {
        CBytesShort { bytes: Some(bytes) }
    }

    #[inline]
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    #[inline]
    pub fn into_plain(self) -> Option<Vec<u8>> {
        self.bytes
    }
}

impl FromCursor for CBytesShort {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<CBytesShort> {
        let len = CIntShort::from_cursor(cursor, version)?;

        if len < 0 {
            return Ok(CBytesShort { bytes: None });
        }

        cursor_next_value(cursor, len as usize).map(CBytesShort::new)
    }
}

impl Serialize for CBytesShort {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match &self.bytes {
            Some(bytes) => {
                let len = bytes.len() as CIntShort;
                len.serialize(cursor, version);
                bytes.serialize(cursor, version);
            }
            None => NULL_SHORT_LEN.serialize(cursor, version),
        }
    }
}

/// `[int]`
pub type CInt = i32;

impl FromCursor for CInt {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<CInt> {
        let mut buff = [0; INT_LEN];
        cursor.read_exact(&mut buff)?;

        Ok(CInt::from_be_bytes(buff))
    }
}

/// `[short]`
pub type CIntShort = i16;

impl FromCursor for CIntShort {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<CIntShort> {
        let mut buff = [0; SHORT_LEN];
        cursor.read_exact(&mut buff)?;

        Ok(CIntShort::from_be_bytes(buff))
    }
}

/// `[long]`
pub type CLong = i64;

impl FromCursor for CLong {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Self> {
        let mut buff = [0; LONG_LEN];
        cursor.read_exact(&mut buff)?;

        Ok(CLong::from_be_bytes(buff))
    }
}

impl FromCursor for u16 {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Self> {
        let mut buff = [0; SHORT_LEN];
        cursor.read_exact(&mut buff)?;

        Ok(u16::from_be_bytes(buff))
    }
}

/// Fails when `len` does not fit an unsigned `[short]` length or count.
pub fn check_short_len(len: usize, what: &str) -> Result<()> {
    if len > u16::MAX as usize {
        return Err(Error::InvalidArgument(format!(
            "{what} of {len} exceeds the maximum of {}",
            u16::MAX
        )));
    }

    Ok(())
}

/// `[string]`
impl Serialize for String {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str(cursor, self, version);
    }
}

impl FromCursor for String {
    #[inline]
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Self> {
        from_cursor_str(cursor).map(str::to_string)
    }
}

/// `[string list]`
impl Serialize for Vec<String> {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str_list(cursor, self.iter().map(String::as_str), version);
    }
}

impl FromCursor for Vec<String> {
    #[inline]
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Self> {
        from_cursor_string_list(cursor)
    }
}

/// Single byte flag, any non-zero value being `true`.
impl Serialize for bool {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        u8::from(*self).serialize(cursor, version);
    }
}

impl FromCursor for bool {
    #[inline]
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<Self> {
        u8::from_cursor(cursor, version).map(|value| value != 0)
    }
}

impl FromCursor for u8 {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> Result<Self> {
        let mut buff = [0];
        cursor.read_exact(&mut buff)?;

        Ok(buff[0])
    }
}

/// `[inetaddr]`: one length byte (4 or 16) followed by the address octets.
pub fn serialize_inet_addr(cursor: &mut Cursor<&mut Vec<u8>>, addr: &IpAddr, version: Version) {
    match addr {
        IpAddr::V4(addr) => {
            4u8.serialize(cursor, version);
            addr.octets().serialize(cursor, version);
        }
        IpAddr::V6(addr) => {
            16u8.serialize(cursor, version);
            addr.octets().serialize(cursor, version);
        }
    }
}

pub fn from_cursor_inet_addr(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<IpAddr> {
    let len = u8::from_cursor(cursor, version)?;
    let octets = cursor_next_value_ref(cursor, len as usize)?;

    match octets.len() {
        4 => Ok(IpAddr::from(convert_to_array::<4>(octets)?)),
        16 => Ok(IpAddr::from(convert_to_array::<16>(octets)?)),
        len => Err(Error::General(format!("Invalid inet address length: {len}"))),
    }
}

pub fn cursor_next_value(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    Ok(cursor_next_value_ref(cursor, len)?.to_vec())
}

pub fn cursor_next_value_ref<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8]> {
    let start = cursor.position() as usize;
    let buffer: &'a [u8] = cursor.get_ref();
    let result = start
        .checked_add(len)
        .and_then(|end| buffer.get(start..end))
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes at offset {start}"),
            ))
        })?;

    cursor.set_position((start + len) as u64);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::traits::FromCursor;
    use std::io::Cursor;

    #[test]
    fn test_from_cursor_str() {
        let a = &[0, 3, 102, 111, 111, 0];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let cstring = from_cursor_str(&mut cursor).unwrap();
        assert_eq!(cstring, "foo");
    }

    #[test]
    fn test_from_cursor_str_long() {
        let a = &[0, 0, 0, 3, 102, 111, 111, 0];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let cstring = from_cursor_str_long(&mut cursor).unwrap();
        assert_eq!(cstring, "foo");
    }

    #[test]
    fn test_from_cursor_str_truncated() {
        let a = &[0, 5, 102, 111];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        assert!(from_cursor_str(&mut cursor).is_err());
    }

    #[test]
    fn test_serialize_str() {
        let mut buf = vec![];
        serialize_str(&mut Cursor::new(&mut buf), "foo", Version::V4);

        assert_eq!(buf, &[0, 3, 102, 111, 111]);
    }

    #[test]
    fn test_serialize_str_long() {
        let mut buf = vec![];
        serialize_str_long(&mut Cursor::new(&mut buf), "foo", Version::V4);

        assert_eq!(buf, &[0, 0, 0, 3, 102, 111, 111]);
    }

    #[test]
    fn test_cstringlist() {
        let a = &[0, 2, 0, 3, 102, 111, 111, 0, 3, 102, 111, 112];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let list = from_cursor_string_list(&mut cursor).unwrap();

        assert_eq!(list, vec!("foo".to_string(), "fop".to_string()));
    }

    #[test]
    fn test_string_multimap() {
        let a = &[0, 1, 0, 1, b'k', 0, 2, 0, 1, b'a', 0, 1, b'b'];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let map = from_cursor_string_multimap(&mut cursor).unwrap();

        assert_eq!(
            map,
            vec![("k".to_string(), vec!["a".to_string(), "b".to_string()])]
        );
    }

    #[test]
    fn test_serialize_str_map() {
        let mut buf = vec![];
        serialize_str_map(
            &mut Cursor::new(&mut buf),
            [("a", "b")].into_iter(),
            Version::V4,
        );

        assert_eq!(buf, &[0, 1, 0, 1, b'a', 0, 1, b'b']);
    }

    #[test]
    fn test_cbytes_from_cursor() {
        let a = &[0, 0, 0, 3, 1, 2, 3];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let cbytes = CBytes::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(cbytes.into_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cbytes_null() {
        let a = &[255, 255, 255, 255];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let cbytes = CBytes::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(cbytes, CBytes::new_empty());
        assert_eq!(cbytes.serialize_to_vec(Version::V4), a.to_vec());
    }

    #[test]
    fn test_cbytes_serialize() {
        let cbytes = CBytes::new(vec![1, 2, 3]);
        assert_eq!(cbytes.serialize_to_vec(Version::V4), vec![0, 0, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn test_cbytesshort_from_cursor() {
        let a = &[0, 3, 1, 2, 3];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let cbytes = CBytesShort::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(cbytes.into_plain().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cbytesshort_serialize() {
        let cbytes = CBytesShort::new(vec![1, 2, 3]);
        assert_eq!(cbytes.serialize_to_vec(Version::V4), vec![0, 3, 1, 2, 3]);
    }

    #[test]
    fn test_cint_from_cursor() {
        let a = &[0, 0, 0, 5];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let i = CInt::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(i, 5);
    }

    #[test]
    fn test_cursor_next_value() {
        let a = &[0, 1, 2, 3, 4];
        let mut cursor: Cursor<&[u8]> = Cursor::new(a);
        let val = cursor_next_value(&mut cursor, 3).unwrap();
        assert_eq!(val, vec![0, 1, 2]);
        assert!(cursor_next_value(&mut cursor, 3).is_err());
    }

    #[test]
    fn test_try_i64_from_bytes() {
        let bytes: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 12];
        assert_eq!(try_i64_from_bytes(&bytes).unwrap(), 12i64);
        assert!(try_i64_from_bytes(&bytes[..4]).is_err());
    }

    #[test]
    fn test_inet_addr() {
        let addr: IpAddr = "10.0.0.7".parse().unwrap();
        let mut buf = vec![];
        serialize_inet_addr(&mut Cursor::new(&mut buf), &addr, Version::V5);
        assert_eq!(buf, &[4, 10, 0, 0, 7]);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&buf);
        assert_eq!(from_cursor_inet_addr(&mut cursor, Version::V5).unwrap(), addr);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&[3, 1, 2, 3]);
        assert!(from_cursor_inet_addr(&mut cursor, Version::V5).is_err());
    }
}
