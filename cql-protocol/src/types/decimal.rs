use derive_more::{Constructor, Display};
use num_bigint::BigInt;
use std::io::Cursor;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::frame::{FromBytes, Serialize, Version};
use crate::types::{try_i32_from_bytes, INT_LEN};

/// Arbitrary precision decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Constructor, Ord, PartialOrd, Eq, Hash, Display)]
#[display("{unscaled}E-{scale}")]
pub struct Decimal {
    pub unscaled: BigInt,
    pub scale: i32,
}

impl Serialize for Decimal {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.scale.serialize(cursor, version);
        varint_to_bytes(&self.unscaled).serialize(cursor, version);
    }
}

impl FromBytes for Decimal {
    fn from_bytes(bytes: &[u8]) -> Result<Decimal> {
        if bytes.len() < INT_LEN {
            return Err(Error::General(format!(
                "Decimal needs at least {INT_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let scale = try_i32_from_bytes(&bytes[..INT_LEN])?;
        let unscaled = varint_from_bytes(&bytes[INT_LEN..]);

        Ok(Decimal::new(unscaled, scale))
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let (integral, fraction) = match value.split_once('.') {
            Some((integral, fraction)) => (integral, fraction),
            None => (value, ""),
        };

        if fraction.starts_with(['-', '+']) {
            return Err(Error::InvalidArgument(format!("Invalid decimal: {value}")));
        }

        let unscaled = BigInt::from_str(&format!("{integral}{fraction}"))
            .map_err(|error| Error::InvalidArgument(format!("Invalid decimal {value}: {error}")))?;

        Ok(Decimal::new(unscaled, fraction.len() as i32))
    }
}

macro_rules! impl_from_for_decimal {
    ($t:ty) => {
        impl From<$t> for Decimal {
            fn from(i: $t) -> Self {
                Decimal {
                    unscaled: i.into(),
                    scale: 0,
                }
            }
        }
    };
}

impl_from_for_decimal!(i8);
impl_from_for_decimal!(i16);
impl_from_for_decimal!(i32);
impl_from_for_decimal!(i64);
impl_from_for_decimal!(u8);
impl_from_for_decimal!(u16);
impl_from_for_decimal!(u32);

/// Encodes a `varint`: minimal big-endian two's-complement.
#[inline]
pub fn varint_to_bytes(value: &BigInt) -> Vec<u8> {
    value.to_signed_bytes_be()
}

#[inline]
pub fn varint_from_bytes(bytes: &[u8]) -> BigInt {
    BigInt::from_signed_bytes_be(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn serialize_test() {
        assert_eq!(
            Decimal::new(129.into(), 0).serialize_to_vec(Version::V4),
            vec![0, 0, 0, 0, 0x00, 0x81]
        );

        assert_eq!(
            Decimal::new(BigInt::from(-129), 0).serialize_to_vec(Version::V4),
            vec![0, 0, 0, 0, 0xFF, 0x7F]
        );

        let expected: Vec<u8> = vec![0, 0, 0, 1, 0x00, 0x81];
        assert_eq!(
            Decimal::new(129.into(), 1).serialize_to_vec(Version::V4),
            expected
        );

        let expected: Vec<u8> = vec![0, 0, 0, 1, 0xFF, 0x7F];
        assert_eq!(
            Decimal::new(BigInt::from(-129), 1).serialize_to_vec(Version::V4),
            expected
        );
    }

    #[test]
    fn from_bytes_test() {
        assert_eq!(
            Decimal::from_bytes(&[0, 0, 0, 2, 0xFF, 0x7F]).unwrap(),
            Decimal::new(BigInt::from(-129), 2)
        );
        assert!(Decimal::from_bytes(&[0, 0]).is_err());
    }

    #[test]
    fn from_str_test() {
        assert_eq!(
            Decimal::from_str("123.45").unwrap(),
            Decimal::new(12345.into(), 2)
        );
        assert_eq!(
            Decimal::from_str("-0.5").unwrap(),
            Decimal::new(BigInt::from(-5), 1)
        );
        assert_eq!(Decimal::from_str("42").unwrap(), Decimal::from(42));
        assert!(Decimal::from_str("1.-2").is_err());
        assert!(Decimal::from_str("abc").is_err());
    }

    #[test]
    fn varint_test() {
        assert_eq!(varint_to_bytes(&0.into()), vec![0x00]);
        assert_eq!(varint_to_bytes(&127.into()), vec![0x7F]);
        assert_eq!(varint_to_bytes(&128.into()), vec![0x00, 0x80]);
        assert_eq!(varint_to_bytes(&BigInt::from(-1)), vec![0xFF]);
        assert_eq!(varint_to_bytes(&BigInt::from(-128)), vec![0x80]);
        assert_eq!(varint_to_bytes(&BigInt::from(-129)), vec![0xFF, 0x7F]);

        assert_eq!(varint_from_bytes(&[0x00, 0x80]), BigInt::from(128));
        assert_eq!(varint_from_bytes(&[0xFF, 0x7F]), BigInt::from(-129));
    }
}
