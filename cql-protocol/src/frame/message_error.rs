//! ERROR response bodies: an error code, a message and, for some codes, structured details.
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::net::IpAddr;

use derive_more::Display;

use super::Serialize;
use crate::consistency::Consistency;
use crate::frame::traits::FromCursor;
use crate::frame::Version;
use crate::types::*;
use crate::{error, Error};

/// Implements both codec directions for a struct sent as its fields, in declaration order.
macro_rules! fields_codec {
    ($name:ident { $($field:ident),+ $(,)? }) => {
        impl Serialize for $name {
            fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
                $(self.$field.serialize(cursor, version);)+
            }
        }

        impl FromCursor for $name {
            fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
                Ok($name {
                    $($field: FromCursor::from_cursor(cursor, version)?,)+
                })
            }
        }
    };
}

/// Error returned by the server. Depending on the code, `additional_info` carries the details the
/// retry policy needs (consistency, required and received replica counts, write type).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ErrorBody {
    pub error_code: CInt,
    pub message: String,
    pub additional_info: AdditionalErrorInfo,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (code {:#06x}): {}",
            self.additional_info, self.error_code, self.message
        )
    }
}

impl ErrorBody {
    /// Builds an error with the code matching `additional_info`.
    pub fn new(additional_info: AdditionalErrorInfo, message: impl Into<String>) -> Self {
        ErrorBody {
            error_code: additional_info.code(),
            message: message.into(),
            additional_info,
        }
    }

    /// Checks if the error is a consequence of the coordinator being unable to serve requests at
    /// the moment, rather than a problem with the request itself.
    #[inline]
    pub fn is_coordinator_failure(&self) -> bool {
        matches!(
            self.additional_info,
            AdditionalErrorInfo::Server
                | AdditionalErrorInfo::Overloaded
                | AdditionalErrorInfo::IsBootstrapping
        )
    }
}

impl Serialize for ErrorBody {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.error_code.serialize(cursor, version);
        self.message.serialize(cursor, version);
        self.additional_info.serialize(cursor, version);
    }
}

impl FromCursor for ErrorBody {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<ErrorBody> {
        let error_code = CInt::from_cursor(cursor, version)?;
        let message = String::from_cursor(cursor, version)?;
        let additional_info =
            AdditionalErrorInfo::from_cursor_with_code(cursor, error_code, version)?;

        Ok(ErrorBody {
            error_code,
            message,
            additional_info,
        })
    }
}

/// Replicas which failed a read or a write. V5 reports a reason code per endpoint, earlier
/// versions only their number.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Failures {
    Count(CInt),
    ByEndpoint(HashMap<IpAddr, CIntShort>),
}

impl Failures {
    pub fn len(&self) -> usize {
        match self {
            Failures::Count(count) => (*count).max(0) as usize,
            Failures::ByEndpoint(reasons) => reasons.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Failures {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match self {
            Failures::Count(count) => count.serialize(cursor, version),
            Failures::ByEndpoint(reasons) => {
                (reasons.len() as CInt).serialize(cursor, version);

                for (endpoint, reason) in reasons {
                    serialize_inet_addr(cursor, endpoint, version);
                    reason.serialize(cursor, version);
                }
            }
        }
    }
}

impl FromCursor for Failures {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let count = CInt::from_cursor(cursor, version)?;
        if version < Version::V5 {
            return Ok(Failures::Count(count));
        }

        (0..count.max(0))
            .map(|_| {
                let endpoint = from_cursor_inet_addr(cursor, version)?;
                let reason = CIntShort::from_cursor(cursor, version)?;
                Ok((endpoint, reason))
            })
            .collect::<error::Result<_>>()
            .map(Failures::ByEndpoint)
    }
}

/// Error kind, with the details some kinds carry.
#[derive(Debug, PartialEq, Eq, Clone, Display)]
pub enum AdditionalErrorInfo {
    #[display("server error")]
    Server,
    #[display("protocol error")]
    Protocol,
    #[display("authentication error")]
    Authentication,
    #[display("unavailable")]
    Unavailable(UnavailableError),
    #[display("overloaded")]
    Overloaded,
    #[display("bootstrapping")]
    IsBootstrapping,
    #[display("truncate error")]
    Truncate,
    #[display("write timeout")]
    WriteTimeout(WriteTimeoutError),
    #[display("read timeout")]
    ReadTimeout(ReadTimeoutError),
    #[display("read failure")]
    ReadFailure(ReadFailureError),
    #[display("function failure")]
    FunctionFailure(FunctionFailureError),
    #[display("write failure")]
    WriteFailure(WriteFailureError),
    #[display("syntax error")]
    Syntax,
    #[display("unauthorized")]
    Unauthorized,
    #[display("invalid query")]
    Invalid,
    #[display("config error")]
    Config,
    #[display("already exists")]
    AlreadyExists(AlreadyExistsError),
    #[display("unprepared")]
    Unprepared(UnpreparedError),
}

impl AdditionalErrorInfo {
    /// Wire code of this kind of error.
    pub fn code(&self) -> CInt {
        use AdditionalErrorInfo::*;

        match self {
            Server => 0x0000,
            Protocol => 0x000A,
            Authentication => 0x0100,
            Unavailable(_) => 0x1000,
            Overloaded => 0x1001,
            IsBootstrapping => 0x1002,
            Truncate => 0x1003,
            WriteTimeout(_) => 0x1100,
            ReadTimeout(_) => 0x1200,
            ReadFailure(_) => 0x1300,
            FunctionFailure(_) => 0x1400,
            WriteFailure(_) => 0x1500,
            Syntax => 0x2000,
            Unauthorized => 0x2100,
            Invalid => 0x2200,
            Config => 0x2300,
            AlreadyExists(_) => 0x2400,
            Unprepared(_) => 0x2500,
        }
    }

    /// Reads the details which follow the message for the given code.
    pub fn from_cursor_with_code(
        cursor: &mut Cursor<&[u8]>,
        error_code: CInt,
        version: Version,
    ) -> error::Result<AdditionalErrorInfo> {
        use AdditionalErrorInfo::*;

        Ok(match error_code {
            0x0000 => Server,
            0x000A => Protocol,
            0x0100 => Authentication,
            0x1000 => Unavailable(FromCursor::from_cursor(cursor, version)?),
            0x1001 => Overloaded,
            0x1002 => IsBootstrapping,
            0x1003 => Truncate,
            0x1100 => WriteTimeout(FromCursor::from_cursor(cursor, version)?),
            0x1200 => ReadTimeout(FromCursor::from_cursor(cursor, version)?),
            0x1300 => ReadFailure(FromCursor::from_cursor(cursor, version)?),
            0x1400 => FunctionFailure(FromCursor::from_cursor(cursor, version)?),
            0x1500 => WriteFailure(FromCursor::from_cursor(cursor, version)?),
            0x2000 => Syntax,
            0x2100 => Unauthorized,
            0x2200 => Invalid,
            0x2300 => Config,
            0x2400 => AlreadyExists(FromCursor::from_cursor(cursor, version)?),
            0x2500 => Unprepared(FromCursor::from_cursor(cursor, version)?),
            _ => return Err(Error::UnexpectedErrorCode(error_code)),
        })
    }
}

impl Serialize for AdditionalErrorInfo {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        use AdditionalErrorInfo::*;

        match self {
            Unavailable(details) => details.serialize(cursor, version),
            WriteTimeout(details) => details.serialize(cursor, version),
            ReadTimeout(details) => details.serialize(cursor, version),
            ReadFailure(details) => details.serialize(cursor, version),
            FunctionFailure(details) => details.serialize(cursor, version),
            WriteFailure(details) => details.serialize(cursor, version),
            AlreadyExists(details) => details.serialize(cursor, version),
            Unprepared(details) => details.serialize(cursor, version),
            _ => {}
        }
    }
}

/// Not enough live replicas to satisfy the requested consistency.
#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Copy, Clone, Hash)]
pub struct UnavailableError {
    pub consistency: Consistency,
    pub required: CInt,
    /// Replicas known to be alive when the request was processed.
    pub alive: CInt,
}

fields_codec!(UnavailableError {
    consistency,
    required,
    alive
});

#[derive(Debug, PartialEq, Copy, Clone, Ord, PartialOrd, Eq, Hash)]
pub struct WriteTimeoutError {
    pub consistency: Consistency,
    /// Replicas which acknowledged the write.
    pub received: CInt,
    pub required: CInt,
    pub write_type: WriteType,
}

fields_codec!(WriteTimeoutError {
    consistency,
    received,
    required,
    write_type
});

#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Copy, Clone, Hash)]
pub struct ReadTimeoutError {
    pub consistency: Consistency,
    pub received: CInt,
    pub required: CInt,
    /// Whether the replica asked for data answered.
    pub data_retrieved: bool,
}

fields_codec!(ReadTimeoutError {
    consistency,
    received,
    required,
    data_retrieved
});

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ReadFailureError {
    pub consistency: Consistency,
    pub received: CInt,
    pub required: CInt,
    pub failures: Failures,
    pub data_retrieved: bool,
}

fields_codec!(ReadFailureError {
    consistency,
    received,
    required,
    failures,
    data_retrieved
});

/// A user defined function failed.
#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct FunctionFailureError {
    pub keyspace: String,
    pub function: String,
    /// CQL types of the arguments.
    pub arg_types: Vec<String>,
}

fields_codec!(FunctionFailureError {
    keyspace,
    function,
    arg_types
});

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WriteFailureError {
    pub consistency: Consistency,
    pub received: CInt,
    pub required: CInt,
    pub failures: Failures,
    pub write_type: WriteType,
}

fields_codec!(WriteFailureError {
    consistency,
    received,
    required,
    failures,
    write_type
});

/// Kind of write which timed out or failed. Sent as its display name.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone, Display)]
pub enum WriteType {
    /// Neither batched nor a counter update.
    #[display("SIMPLE")]
    Simple,
    /// Logged batch, after the batch log was written.
    #[display("BATCH")]
    Batch,
    #[display("UNLOGGED_BATCH")]
    UnloggedBatch,
    #[display("COUNTER")]
    Counter,
    /// Write to the batch log itself.
    #[display("BATCH_LOG")]
    BatchLog,
    #[display("CAS")]
    Cas,
    #[display("VIEW")]
    View,
    #[display("CDC")]
    Cdc,
}

impl WriteType {
    const ALL: [WriteType; 8] = [
        WriteType::Simple,
        WriteType::Batch,
        WriteType::UnloggedBatch,
        WriteType::Counter,
        WriteType::BatchLog,
        WriteType::Cas,
        WriteType::View,
        WriteType::Cdc,
    ];
}

impl Serialize for WriteType {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str(cursor, &self.to_string(), version);
    }
}

impl FromCursor for WriteType {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> error::Result<WriteType> {
        let name = from_cursor_str(cursor)?;

        WriteType::ALL
            .into_iter()
            .find(|write_type| write_type.to_string() == name)
            .ok_or_else(|| Error::UnexpectedWriteType(name.into()))
    }
}

/// A keyspace or table to be created already exists.
#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct AlreadyExistsError {
    pub keyspace: String,
    /// Empty when the keyspace itself exists.
    pub table: String,
}

fields_codec!(AlreadyExistsError { keyspace, table });

/// The coordinator does not know the executed prepared statement id.
#[derive(Debug, PartialEq, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct UnpreparedError {
    pub id: CBytesShort,
}

fields_codec!(UnpreparedError { id });
