use derive_more::{Constructor, Display};
use std::convert::TryFrom;
use std::num::Wrapping;

use crate::error::Error;

const C1: Wrapping<i64> = Wrapping(0x87c3_7b91_1142_53d5_u64 as i64);
const C2: Wrapping<i64> = Wrapping(0x4cf5_ad43_2745_937f_u64 as i64);

/// A token on the Murmur3 ring.
#[derive(
    Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Default, Debug, Hash, Constructor, Display,
)]
pub struct Murmur3Token {
    pub value: i64,
}

impl Murmur3Token {
    /// Computes the token of a serialized partition key, matching the server's partitioner.
    /// Tail bytes are sign-extended, as the server does.
    pub fn generate(routing_key: &[u8]) -> Self {
        let length = routing_key.len();

        let mut h1: Wrapping<i64> = Wrapping(0);
        let mut h2: Wrapping<i64> = Wrapping(0);

        let mut blocks = routing_key.chunks_exact(16);
        for block in &mut blocks {
            let mut k1 = Wrapping(read_i64_le(&block[..8]));
            let mut k2 = Wrapping(read_i64_le(&block[8..]));

            k1 *= C1;
            k1 = rotl64(k1, 31);
            k1 *= C2;
            h1 ^= k1;

            h1 = rotl64(h1, 27);
            h1 += h2;
            h1 = h1 * Wrapping(5) + Wrapping(0x52dce729);

            k2 *= C2;
            k2 = rotl64(k2, 33);
            k2 *= C1;
            h2 ^= k2;

            h2 = rotl64(h2, 31);
            h2 += h1;
            h2 = h2 * Wrapping(5) + Wrapping(0x38495ab5);
        }

        let tail = blocks.remainder();

        let mut k1 = Wrapping(0_i64);
        let mut k2 = Wrapping(0_i64);

        if tail.len() > 8 {
            for i in (8..tail.len()).rev() {
                k2 ^= Wrapping(tail[i] as i8 as i64) << ((i - 8) * 8);
            }

            k2 *= C2;
            k2 = rotl64(k2, 33);
            k2 *= C1;
            h2 ^= k2;
        }

        if !tail.is_empty() {
            for i in (0..tail.len().min(8)).rev() {
                k1 ^= Wrapping(tail[i] as i8 as i64) << (i * 8);
            }

            k1 *= C1;
            k1 = rotl64(k1, 31);
            k1 *= C2;
            h1 ^= k1;
        }

        h1 ^= Wrapping(length as i64);
        h2 ^= Wrapping(length as i64);

        h1 += h2;
        h2 += h1;

        h1 = fmix(h1);
        h2 = fmix(h2);

        h1 += h2;

        // the minimum token is reserved by the partitioner
        if h1.0 == i64::MIN {
            Murmur3Token::new(i64::MAX)
        } else {
            Murmur3Token::new(h1.0)
        }
    }
}

impl TryFrom<String> for Murmur3Token {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|error| Error::General(format!("Error parsing token {value}: {error}")))
            .map(Murmur3Token::new)
    }
}

impl From<i64> for Murmur3Token {
    fn from(value: i64) -> Self {
        Murmur3Token::new(value)
    }
}

#[inline]
fn read_i64_le(bytes: &[u8]) -> i64 {
    let mut buffer = [0; 8];
    buffer.copy_from_slice(bytes);
    i64::from_le_bytes(buffer)
}

#[inline]
fn rotl64(v: Wrapping<i64>, n: u32) -> Wrapping<i64> {
    Wrapping((v.0 << n) | (v.0 as u64 >> (64 - n)) as i64)
}

#[inline]
fn fmix(mut k: Wrapping<i64>) -> Wrapping<i64> {
    k ^= Wrapping((k.0 as u64 >> 33) as i64);
    k *= Wrapping(0xff51afd7ed558ccd_u64 as i64);
    k ^= Wrapping((k.0 as u64 >> 33) as i64);
    k *= Wrapping(0xc4ceb9fe1a85ec53_u64 as i64);
    k ^= Wrapping((k.0 as u64 >> 33) as i64);

    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_hash_known_keys() {
        let cases: [(&str, i64); 4] = [
            ("test", -6017608668500074083),
            ("xd", 4507812186440344727),
            ("primary_key", -1632642444691073360),
            ("kremówki", 4354931215268080151),
        ];

        for (key, token) in cases {
            assert_eq!(Murmur3Token::generate(key.as_bytes()).value, token, "{key}");
        }
    }

    #[test]
    fn should_hash_keys_longer_than_a_block() {
        let key: Vec<u8> = (0..40).collect();
        assert_eq!(Murmur3Token::generate(&key), Murmur3Token::generate(&key));
        assert_ne!(
            Murmur3Token::generate(&key),
            Murmur3Token::generate(&key[..39])
        );
    }

    #[test]
    fn should_parse_tokens() {
        assert_eq!(
            Murmur3Token::try_from("-42".to_string()).unwrap(),
            Murmur3Token::new(-42)
        );
        assert!(Murmur3Token::try_from("x".to_string()).is_err());
    }
}
