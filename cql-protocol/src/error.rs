use crate::consistency::Consistency;
use crate::frame::message_error::{AdditionalErrorInfo, ErrorBody};
use crate::frame::{Opcode, ProtocolFeature, Version};
use crate::types::{CInt, CIntShort};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::net::SocketAddr;
use std::result;
use std::str::Utf8Error;
use std::string::FromUtf8Error;
use thiserror::Error as ThisError;
use uuid::Error as UuidError;

pub type Result<T> = result::Result<T, Error>;

/// Driver error type. Errors fall into three groups: failures of a single connection (I/O,
/// timeouts, closed connections), errors returned by the server in ERROR frames, and programming
/// errors detected before anything is sent (unsupported protocol features, invalid arguments).
#[derive(Debug, ThisError)]
pub enum Error {
    /// Internal IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Internal error that may be raised during `uuid::Uuid::from_slice`
    #[error("Uuid parse error: {0}")]
    UuidParse(#[from] UuidError),
    /// General error
    #[error("General error: {0}")]
    General(String),
    /// Internal error that may be raised during `String::from_utf8`
    #[error("FromUtf8 error: {0}")]
    FromUtf8(#[from] FromUtf8Error),
    /// Internal error that may be raised during `str::from_utf8`
    #[error("Utf8 error: {0}")]
    Utf8(#[from] Utf8Error),
    /// Server error.
    #[error("Server {addr} error: {body}")]
    Server { body: ErrorBody, addr: SocketAddr },
    /// Timed out waiting for an operation to complete.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// The connection was closed while a request was in flight.
    #[error("Connection to {0} closed")]
    ConnectionClosed(SocketAddr),
    /// A request field was set which the negotiated protocol version cannot encode.
    #[error("{feature} is not supported by protocol {version}")]
    UnsupportedFeature {
        feature: ProtocolFeature,
        version: Version,
    },
    /// Invalid argument passed to a constructor or builder.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A serial consistency was required, but a regular one was given.
    #[error("Consistency {0} is not a serial consistency")]
    NotSerialConsistency(Consistency),
    /// Every host in the query plan was tried without success.
    #[error("No host available: {0}")]
    NoHostAvailable(TriedHosts),
    /// The request was cancelled before completing.
    #[error("Request cancelled")]
    Cancelled,
    /// Unknown consistency.
    #[error("Unknown consistency: {0}")]
    UnknownConsistency(CIntShort),
    /// Unexpected additional error info.
    #[error("Unexpected error code: {0}")]
    UnexpectedErrorCode(CInt),
    /// Unexpected write type.
    #[error("Unexpected write type: {0}")]
    UnexpectedWriteType(String),
    /// Expected a request opcode, got something else.
    #[error("Opcode is not a request: {0}")]
    NonRequestOpcode(Opcode),
    /// Expected a response opcode, got something else.
    #[error("Opcode is not a response: {0}")]
    NonResponseOpcode(Opcode),
    /// Unexpected result kind.
    #[error("Unexpected result kind: {0}")]
    UnexpectedResultKind(CInt),
    /// Unexpected column type.
    #[error("Unexpected column type: {0}")]
    UnexpectedColumnType(CIntShort),
    /// Unexpected response to a request.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(Opcode),
}

impl Error {
    /// Returns the server error body, if this is a server error.
    #[inline]
    pub fn server_error(&self) -> Option<&ErrorBody> {
        match self {
            Error::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Checks if the error was caused by the connection to a single host rather than by the
    /// request itself, so trying another host might succeed.
    pub fn is_connection_level(&self) -> bool {
        match self {
            Error::Io(_) | Error::Timeout(_) | Error::ConnectionClosed(_) => true,
            Error::Server { body, .. } => matches!(
                body.additional_info,
                AdditionalErrorInfo::Overloaded
                    | AdditionalErrorInfo::IsBootstrapping
                    | AdditionalErrorInfo::Server
            ),
            _ => false,
        }
    }
}

/// Errors encountered per host while walking a query plan.
#[derive(Debug, Clone, Default)]
pub struct TriedHosts(pub FxHashMap<SocketAddr, Error>);

impl TriedHosts {
    #[inline]
    pub fn get(&self, addr: &SocketAddr) -> Option<&Error> {
        self.0.get(addr)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for TriedHosts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no hosts were tried");
        }

        let tried = self
            .0
            .iter()
            .sorted_by_key(|(addr, _)| **addr)
            .map(|(addr, error)| format!("{addr}: {error}"))
            .join(", ");

        write!(f, "tried {tried}")
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::General(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Error {
        Error::General(err.to_string())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Io(error) => Error::Io(io::Error::new(
                error.kind(),
                error
                    .get_ref()
                    .map(|error| error.to_string())
                    .unwrap_or_default(),
            )),
            Error::UuidParse(error) => Error::UuidParse(error.clone()),
            Error::General(error) => Error::General(error.clone()),
            Error::FromUtf8(error) => Error::FromUtf8(error.clone()),
            Error::Utf8(error) => Error::Utf8(*error),
            Error::Server { body, addr } => Error::Server {
                body: body.clone(),
                addr: *addr,
            },
            Error::Timeout(error) => Error::Timeout(error.clone()),
            Error::ConnectionClosed(addr) => Error::ConnectionClosed(*addr),
            Error::UnsupportedFeature { feature, version } => Error::UnsupportedFeature {
                feature: *feature,
                version: *version,
            },
            Error::InvalidArgument(error) => Error::InvalidArgument(error.clone()),
            Error::NotSerialConsistency(consistency) => Error::NotSerialConsistency(*consistency),
            Error::NoHostAvailable(tried) => Error::NoHostAvailable(tried.clone()),
            Error::Cancelled => Error::Cancelled,
            Error::UnknownConsistency(value) => Error::UnknownConsistency(*value),
            Error::UnexpectedErrorCode(value) => Error::UnexpectedErrorCode(*value),
            Error::UnexpectedWriteType(value) => Error::UnexpectedWriteType(value.clone()),
            Error::NonRequestOpcode(value) => Error::NonRequestOpcode(*value),
            Error::NonResponseOpcode(value) => Error::NonResponseOpcode(*value),
            Error::UnexpectedResultKind(value) => Error::UnexpectedResultKind(*value),
            Error::UnexpectedColumnType(value) => Error::UnexpectedColumnType(*value),
            Error::UnexpectedResponse(value) => Error::UnexpectedResponse(*value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn should_list_tried_hosts_in_address_order() {
        let first = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9042);
        let second = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), 9042);

        let mut tried = FxHashMap::default();
        tried.insert(second, Error::ConnectionClosed(second));
        tried.insert(first, Error::Timeout("request".into()));

        let error = Error::NoHostAvailable(TriedHosts(tried));
        assert_eq!(
            error.to_string(),
            "No host available: tried 127.0.0.1:9042: Timeout: request, \
             127.0.0.2:9042: Connection to 127.0.0.2:9042 closed"
        );
    }

    #[test]
    fn should_classify_connection_errors() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9042);

        assert!(Error::ConnectionClosed(addr).is_connection_level());
        assert!(Error::Timeout("x".into()).is_connection_level());
        assert!(!Error::Cancelled.is_connection_level());
        assert!(!Error::InvalidArgument("x".into()).is_connection_level());
    }
}
