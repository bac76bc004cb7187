//! Consistency levels, as sent in requests and received in error details.
use std::convert::{From, TryFrom, TryInto};
use std::io;
use std::str::FromStr;

use derive_more::Display;

use crate::error;
use crate::frame::{FromBytes, FromCursor, Serialize, Version};
use crate::types::*;

/// Number of replicas which must acknowledge an operation. `Serial` and `LocalSerial` are only
/// valid as the serial consistency of conditional updates.
#[derive(Debug, PartialEq, Clone, Copy, Display, Ord, PartialOrd, Eq, Hash, Default)]
pub enum Consistency {
    /// Any node, including hinted handoff. Writes only.
    #[display("ANY")]
    Any,
    #[display("ONE")]
    One,
    #[display("TWO")]
    Two,
    #[display("THREE")]
    Three,
    #[display("QUORUM")]
    Quorum,
    #[display("ALL")]
    All,
    /// Quorum of replicas in the coordinator's datacenter.
    #[display("LOCAL_QUORUM")]
    LocalQuorum,
    /// Quorum of replicas in every datacenter.
    #[display("EACH_QUORUM")]
    EachQuorum,
    #[display("SERIAL")]
    Serial,
    #[display("LOCAL_SERIAL")]
    LocalSerial,
    /// One replica in the coordinator's datacenter.
    #[default]
    #[display("LOCAL_ONE")]
    LocalOne,
}

impl Consistency {
    /// Checks if this level is confined to the local datacenter.
    #[inline]
    pub fn is_dc_local(self) -> bool {
        matches!(
            self,
            Consistency::LocalOne | Consistency::LocalQuorum | Consistency::LocalSerial
        )
    }

    /// Checks if this level can be used as a serial consistency.
    #[inline]
    pub fn is_serial(self) -> bool {
        matches!(self, Consistency::Serial | Consistency::LocalSerial)
    }

    /// Returns the level if it can be used as a serial consistency.
    pub fn check_serial(self) -> error::Result<Consistency> {
        if self.is_serial() {
            Ok(self)
        } else {
            Err(error::Error::NotSerialConsistency(self))
        }
    }
}

impl FromStr for Consistency {
    type Err = error::Error;

    /// Accepts both the protocol names (`LOCAL_ONE`) and the variant names (`LocalOne`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "").to_ascii_lowercase();
        let consistency = match normalized.as_str() {
            "any" => Consistency::Any,
            "one" => Consistency::One,
            "two" => Consistency::Two,
            "three" => Consistency::Three,
            "quorum" => Consistency::Quorum,
            "all" => Consistency::All,
            "localquorum" => Consistency::LocalQuorum,
            "eachquorum" => Consistency::EachQuorum,
            "serial" => Consistency::Serial,
            "localserial" => Consistency::LocalSerial,
            "localone" => Consistency::LocalOne,
            _ => {
                return Err(error::Error::InvalidArgument(format!(
                    "Invalid consistency provided: {s}"
                )))
            }
        };

        Ok(consistency)
    }
}

impl Serialize for Consistency {
    fn serialize(&self, cursor: &mut io::Cursor<&mut Vec<u8>>, version: Version) {
        let value: CIntShort = (*self).into();
        value.serialize(cursor, version)
    }
}

impl TryFrom<CIntShort> for Consistency {
    type Error = error::Error;

    fn try_from(value: CIntShort) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(Consistency::Any),
            0x0001 => Ok(Consistency::One),
            0x0002 => Ok(Consistency::Two),
            0x0003 => Ok(Consistency::Three),
            0x0004 => Ok(Consistency::Quorum),
            0x0005 => Ok(Consistency::All),
            0x0006 => Ok(Consistency::LocalQuorum),
            0x0007 => Ok(Consistency::EachQuorum),
            0x0008 => Ok(Consistency::Serial),
            0x0009 => Ok(Consistency::LocalSerial),
            0x000A => Ok(Consistency::LocalOne),
            _ => Err(Self::Error::UnknownConsistency(value)),
        }
    }
}

impl From<Consistency> for CIntShort {
    fn from(value: Consistency) -> Self {
        match value {
            Consistency::Any => 0x0000,
            Consistency::One => 0x0001,
            Consistency::Two => 0x0002,
            Consistency::Three => 0x0003,
            Consistency::Quorum => 0x0004,
            Consistency::All => 0x0005,
            Consistency::LocalQuorum => 0x0006,
            Consistency::EachQuorum => 0x0007,
            Consistency::Serial => 0x0008,
            Consistency::LocalSerial => 0x0009,
            Consistency::LocalOne => 0x000A,
        }
    }
}

impl FromBytes for Consistency {
    fn from_bytes(bytes: &[u8]) -> error::Result<Consistency> {
        try_i16_from_bytes(bytes)
            .map_err(Into::into)
            .and_then(TryInto::try_into)
    }
}

impl FromCursor for Consistency {
    fn from_cursor(cursor: &mut io::Cursor<&[u8]>, version: Version) -> error::Result<Consistency> {
        CIntShort::from_cursor(cursor, version).and_then(TryInto::try_into)
    }
}
