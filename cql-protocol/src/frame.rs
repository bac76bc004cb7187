//! `frame` module contains general Frame functionality.
use bitflags::bitflags;
use derive_more::Display;
use std::convert::TryFrom;
use std::io::Cursor;
use uuid::Uuid;

use crate::error;
use crate::frame::message_request::RequestBody;
use crate::frame::message_response::ResponseBody;
use crate::types::{from_cursor_string_list, CBytes, CIntShort};

pub use crate::frame::traits::*;

/// Number of body length bytes in accordance to protocol.
pub const LENGTH_LEN: usize = 4;

/// Largest body the protocol allows (256 MiB).
pub const MAX_BODY_LEN: usize = 256 * 1024 * 1024;

pub mod message_auth_response;
pub mod message_authenticate;
pub mod message_batch;
pub mod message_credentials;
pub mod message_error;
pub mod message_event;
pub mod message_execute;
pub mod message_prepare;
pub mod message_query;
pub mod message_register;
pub mod message_request;
pub mod message_response;
pub mod message_result;
pub mod message_startup;
pub mod message_supported;
pub mod traits;

/// Stream id of server-initiated EVENT frames.
pub const EVENT_STREAM_ID: StreamId = -1;

pub type StreamId = i16;

/// Native protocol version negotiated with a server.
#[derive(Debug, PartialEq, Copy, Clone, Ord, PartialOrd, Eq, Hash, Display, Default)]
pub enum Version {
    V1,
    V2,
    V3,
    #[default]
    V4,
    V5,
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        match value {
            Version::V1 => 1,
            Version::V2 => 2,
            Version::V3 => 3,
            Version::V4 => 4,
            Version::V5 => 5,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = error::Error;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version & 0x7F {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            3 => Ok(Version::V3),
            4 => Ok(Version::V4),
            5 => Ok(Version::V5),
            v => Err(error::Error::General(format!("Unknown protocol version: {v}"))),
        }
    }
}

impl Version {
    /// Number of bytes that represent frame's version.
    pub const BYTE_LENGTH: usize = 1;

    /// Number of stream id bytes: one on V1/V2, two afterwards.
    #[inline]
    pub fn stream_id_len(self) -> usize {
        if self < Version::V3 {
            1
        } else {
            2
        }
    }

    /// Full header length for this version.
    #[inline]
    pub fn header_len(self) -> usize {
        Self::BYTE_LENGTH + Flags::BYTE_LENGTH + self.stream_id_len() + Opcode::BYTE_LENGTH + LENGTH_LEN
    }

    /// Collections carry 2-byte counts and element lengths before V3.
    #[inline]
    pub fn uses_short_collections(self) -> bool {
        self < Version::V3
    }

    #[inline]
    pub fn supports(self, feature: ProtocolFeature) -> bool {
        match feature {
            ProtocolFeature::Credentials => self == Version::V1,
            feature => self >= feature.min_version(),
        }
    }

    /// Fails with [`error::Error::UnsupportedFeature`] if `feature` cannot be expressed.
    #[inline]
    pub fn check(self, feature: ProtocolFeature) -> error::Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(error::Error::UnsupportedFeature {
                feature,
                version: self,
            })
        }
    }
}

/// Request capabilities which depend on the negotiated protocol version.
#[derive(Debug, PartialEq, Copy, Clone, Eq, Hash, Display)]
pub enum ProtocolFeature {
    #[display("CREDENTIALS")]
    Credentials,
    #[display("AUTH_RESPONSE")]
    AuthResponse,
    #[display("BATCH")]
    Batch,
    #[display("bound values in QUERY")]
    QueryValues,
    #[display("serial consistency")]
    SerialConsistency,
    #[display("paging")]
    Paging,
    #[display("default timestamp")]
    DefaultTimestamp,
    #[display("named values")]
    NamedValues,
    #[display("batch flags")]
    BatchFlags,
    #[display("unset values")]
    UnsetValues,
    #[display("keyspace in request")]
    KeyspaceInRequest,
    #[display("now in seconds")]
    NowInSeconds,
}

impl ProtocolFeature {
    /// Earliest version carrying the feature. `Credentials` is the only feature which was removed
    /// later and is handled by [`Version::supports`].
    pub fn min_version(self) -> Version {
        match self {
            ProtocolFeature::Credentials => Version::V1,
            ProtocolFeature::AuthResponse
            | ProtocolFeature::Batch
            | ProtocolFeature::QueryValues
            | ProtocolFeature::SerialConsistency
            | ProtocolFeature::Paging => Version::V2,
            ProtocolFeature::DefaultTimestamp
            | ProtocolFeature::NamedValues
            | ProtocolFeature::BatchFlags => Version::V3,
            ProtocolFeature::UnsetValues => Version::V4,
            ProtocolFeature::KeyspaceInRequest | ProtocolFeature::NowInSeconds => Version::V5,
        }
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Ord, PartialOrd, Eq, Hash, Display)]
pub enum Direction {
    Request,
    Response,
}

impl From<Direction> for u8 {
    fn from(value: Direction) -> u8 {
        match value {
            Direction::Request => 0x00,
            Direction::Response => 0x80,
        }
    }
}

impl From<u8> for Direction {
    fn from(value: u8) -> Self {
        match value & 0x80 {
            0 => Direction::Request,
            _ => Direction::Response,
        }
    }
}

bitflags! {
    /// Frame's flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const COMPRESSION = 0x01;
        const TRACING = 0x02;
        const CUSTOM_PAYLOAD = 0x04;
        const WARNING = 0x08;
        const BETA = 0x10;
    }
}

impl Flags {
    // Number of flag bytes in accordance to protocol.
    pub const BYTE_LENGTH: usize = 1;
}

#[derive(Debug, PartialEq, Copy, Clone, Ord, PartialOrd, Eq, Hash, Display)]
pub enum Opcode {
    Error,
    Startup,
    Ready,
    Authenticate,
    Credentials,
    Options,
    Supported,
    Query,
    Result,
    Prepare,
    Execute,
    Register,
    Event,
    Batch,
    AuthChallenge,
    AuthResponse,
    AuthSuccess,
}

impl Opcode {
    // Number of opcode bytes in accordance to protocol.
    pub const BYTE_LENGTH: usize = 1;

    #[inline]
    pub fn is_request(self) -> bool {
        matches!(
            self,
            Opcode::Startup
                | Opcode::Credentials
                | Opcode::Options
                | Opcode::Query
                | Opcode::Prepare
                | Opcode::Execute
                | Opcode::Register
                | Opcode::Batch
                | Opcode::AuthResponse
        )
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Error => 0x00,
            Opcode::Startup => 0x01,
            Opcode::Ready => 0x02,
            Opcode::Authenticate => 0x03,
            Opcode::Credentials => 0x04,
            Opcode::Options => 0x05,
            Opcode::Supported => 0x06,
            Opcode::Query => 0x07,
            Opcode::Result => 0x08,
            Opcode::Prepare => 0x09,
            Opcode::Execute => 0x0A,
            Opcode::Register => 0x0B,
            Opcode::Event => 0x0C,
            Opcode::Batch => 0x0D,
            Opcode::AuthChallenge => 0x0E,
            Opcode::AuthResponse => 0x0F,
            Opcode::AuthSuccess => 0x10,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = error::Error;

    fn try_from(value: u8) -> Result<Self, <Opcode as TryFrom<u8>>::Error> {
        match value {
            0x00 => Ok(Opcode::Error),
            0x01 => Ok(Opcode::Startup),
            0x02 => Ok(Opcode::Ready),
            0x03 => Ok(Opcode::Authenticate),
            0x04 => Ok(Opcode::Credentials),
            0x05 => Ok(Opcode::Options),
            0x06 => Ok(Opcode::Supported),
            0x07 => Ok(Opcode::Query),
            0x08 => Ok(Opcode::Result),
            0x09 => Ok(Opcode::Prepare),
            0x0A => Ok(Opcode::Execute),
            0x0B => Ok(Opcode::Register),
            0x0C => Ok(Opcode::Event),
            0x0D => Ok(Opcode::Batch),
            0x0E => Ok(Opcode::AuthChallenge),
            0x0F => Ok(Opcode::AuthResponse),
            0x10 => Ok(Opcode::AuthSuccess),
            _ => Err(error::Error::General(format!("Unknown opcode: {value}"))),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, PartialEq, Copy, Clone, Eq, Hash)]
pub struct FrameHeader {
    pub version: Version,
    pub direction: Direction,
    pub flags: Flags,
    pub stream_id: StreamId,
    pub opcode: Opcode,
    pub body_len: usize,
}

impl FrameHeader {
    /// Parses a header from the start of `bytes`. The buffer must hold at least
    /// [`Version::header_len`] bytes for the version found in the first byte.
    pub fn parse(bytes: &[u8]) -> error::Result<FrameHeader> {
        let first = *bytes
            .first()
            .ok_or_else(|| error::Error::General("Empty frame header".into()))?;

        let version = Version::try_from(first)?;
        let header_len = version.header_len();
        if bytes.len() < header_len {
            return Err(error::Error::General(format!(
                "Frame header for {version} needs {header_len} bytes, got {}",
                bytes.len()
            )));
        }

        let direction = Direction::from(first);
        let flags = Flags::from_bits_truncate(bytes[1]);

        let (stream_id, opcode_pos) = if version.stream_id_len() == 1 {
            (bytes[2] as i8 as StreamId, 3)
        } else {
            (StreamId::from_be_bytes([bytes[2], bytes[3]]), 4)
        };

        let opcode = Opcode::try_from(bytes[opcode_pos])?;
        let len_pos = opcode_pos + Opcode::BYTE_LENGTH;
        let body_len = i32::from_be_bytes([
            bytes[len_pos],
            bytes[len_pos + 1],
            bytes[len_pos + 2],
            bytes[len_pos + 3],
        ]);

        if body_len < 0 || body_len as usize > MAX_BODY_LEN {
            return Err(error::Error::General(format!(
                "Invalid frame body length: {body_len}"
            )));
        }

        Ok(FrameHeader {
            version,
            direction,
            flags,
            stream_id,
            opcode,
            body_len: body_len as usize,
        })
    }

    fn encode(&self, buffer: &mut Vec<u8>) -> error::Result<()> {
        buffer.push(u8::from(self.version) | u8::from(self.direction));
        buffer.push(self.flags.bits());

        if self.version.stream_id_len() == 1 {
            let stream_id = i8::try_from(self.stream_id).map_err(|_| {
                error::Error::InvalidArgument(format!(
                    "Stream id {} does not fit protocol {}",
                    self.stream_id, self.version
                ))
            })?;

            buffer.push(stream_id as u8);
        } else {
            buffer.extend_from_slice(&self.stream_id.to_be_bytes());
        }

        buffer.push(u8::from(self.opcode));

        let body_len = i32::try_from(self.body_len)
            .ok()
            .filter(|len| *len as usize <= MAX_BODY_LEN)
            .ok_or_else(|| {
                error::Error::InvalidArgument(format!("Frame body too large: {}", self.body_len))
            })?;

        buffer.extend_from_slice(&body_len.to_be_bytes());
        Ok(())
    }
}

/// Decoded response frame with the body parsed according to its opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: Version,
    pub flags: Flags,
    pub stream_id: StreamId,
    pub tracing_id: Option<Uuid>,
    pub warnings: Vec<String>,
    pub custom_payload: Vec<(String, CBytes)>,
    pub body: ResponseBody,
}

impl Response {
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.body.opcode()
    }

    #[inline]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

/// Encodes `request` as a complete frame for the given stream and protocol version. Nothing is
/// produced if the request uses a feature the version cannot express.
pub fn write_frame(
    stream_id: StreamId,
    request: &RequestBody,
    version: Version,
) -> error::Result<Vec<u8>> {
    request.check_version(version)?;

    let mut flags = Flags::empty();
    if request.is_tracing() {
        flags.insert(Flags::TRACING);
    }

    let body = request.serialize_to_vec(version);
    let header = FrameHeader {
        version,
        direction: Direction::Request,
        flags,
        stream_id,
        opcode: request.opcode(),
        body_len: body.len(),
    };

    let mut buffer = Vec::with_capacity(version.header_len() + body.len());
    header.encode(&mut buffer)?;
    buffer.extend_from_slice(&body);

    Ok(buffer)
}

/// Decodes a complete response frame.
pub fn read_frame(bytes: &[u8]) -> error::Result<Response> {
    let header = FrameHeader::parse(bytes)?;
    if header.opcode.is_request() {
        return Err(error::Error::NonResponseOpcode(header.opcode));
    }

    if header.flags.contains(Flags::COMPRESSION) {
        return Err(error::Error::General(
            "Compressed frames are not supported".into(),
        ));
    }

    let start = header.version.header_len();
    let body = bytes
        .get(start..start + header.body_len)
        .ok_or_else(|| {
            error::Error::General(format!(
                "Frame body truncated: expected {} bytes, got {}",
                header.body_len,
                bytes.len().saturating_sub(start)
            ))
        })?;

    let mut cursor = Cursor::new(body);

    let tracing_id = if header.flags.contains(Flags::TRACING) {
        Some(crate::types::uuid::from_cursor_uuid(&mut cursor)?)
    } else {
        None
    };

    let warnings = if header.flags.contains(Flags::WARNING) {
        from_cursor_string_list(&mut cursor)?
    } else {
        vec![]
    };

    let custom_payload = if header.flags.contains(Flags::CUSTOM_PAYLOAD) {
        let count = CIntShort::from_cursor(&mut cursor, header.version)?;
        let mut payload = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let key = crate::types::from_cursor_str(&mut cursor)?.to_string();
            let value = CBytes::from_cursor(&mut cursor, header.version)?;
            payload.push((key, value));
        }

        payload
    } else {
        vec![]
    };

    let position = cursor.position() as usize;
    let body = ResponseBody::try_from(&body[position..], header.opcode, header.version)?;

    Ok(Response {
        version: header.version,
        flags: header.flags,
        stream_id: header.stream_id,
        tracing_id,
        warnings,
        custom_payload,
        body,
    })
}

/// Encodes a response frame. Used by servers and test doubles; drivers only write requests.
pub fn write_response_frame(
    stream_id: StreamId,
    body: &ResponseBody,
    version: Version,
) -> error::Result<Vec<u8>> {
    let body_bytes = body.serialize_to_vec(version);
    let header = FrameHeader {
        version,
        direction: Direction::Response,
        flags: Flags::empty(),
        stream_id,
        opcode: body.opcode(),
        body_len: body_bytes.len(),
    };

    let mut buffer = Vec::with_capacity(version.header_len() + body_bytes.len());
    header.encode(&mut buffer)?;
    buffer.extend_from_slice(&body_bytes);

    Ok(buffer)
}

/// Decodes a complete request frame, as a server would.
pub fn read_request_frame(bytes: &[u8]) -> error::Result<(FrameHeader, RequestBody)> {
    let header = FrameHeader::parse(bytes)?;
    if !header.opcode.is_request() {
        return Err(error::Error::NonRequestOpcode(header.opcode));
    }

    let start = header.version.header_len();
    let body = bytes.get(start..start + header.body_len).ok_or_else(|| {
        error::Error::General(format!(
            "Frame body truncated: expected {} bytes",
            header.body_len
        ))
    })?;

    let request = RequestBody::try_from(body, header.opcode, header.version)?;
    Ok((header, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::Consistency;
    use crate::frame::message_query::BodyReqQuery;
    use crate::query::QueryParams;

    #[test]
    fn test_frame_version_as_byte() {
        assert_eq!(u8::from(Version::V1), 0x01);
        assert_eq!(u8::from(Version::V3), 0x03);
        assert_eq!(u8::from(Version::V5), 0x05);

        assert_eq!(u8::from(Direction::Request), 0x00);
        assert_eq!(u8::from(Direction::Response), 0x80);
    }

    #[test]
    fn test_frame_version_from() {
        assert_eq!(Version::try_from(0x01).unwrap(), Version::V1);
        assert_eq!(Version::try_from(0x82).unwrap(), Version::V2);
        assert_eq!(Version::try_from(0x84).unwrap(), Version::V4);
        assert_eq!(Version::try_from(0x85).unwrap(), Version::V5);
        assert!(Version::try_from(0x86).is_err());

        assert_eq!(Direction::from(0x03), Direction::Request);
        assert_eq!(Direction::from(0x85), Direction::Response);
    }

    #[test]
    fn test_opcode_as_byte() {
        assert_eq!(u8::from(Opcode::Error), 0x00);
        assert_eq!(u8::from(Opcode::Credentials), 0x04);
        assert_eq!(u8::from(Opcode::Batch), 0x0D);
        assert_eq!(u8::from(Opcode::AuthSuccess), 0x10);
    }

    #[test]
    fn test_opcode_from() {
        for byte in 0x00..=0x10u8 {
            assert_eq!(u8::from(Opcode::try_from(byte).unwrap()), byte);
        }

        assert!(Opcode::try_from(0x11).is_err());
    }

    #[test]
    fn test_feature_gating() {
        assert!(Version::V1.supports(ProtocolFeature::Credentials));
        assert!(!Version::V2.supports(ProtocolFeature::Credentials));
        assert!(!Version::V1.supports(ProtocolFeature::AuthResponse));
        assert!(!Version::V1.supports(ProtocolFeature::Batch));
        assert!(Version::V2.supports(ProtocolFeature::SerialConsistency));
        assert!(!Version::V2.supports(ProtocolFeature::DefaultTimestamp));
        assert!(Version::V3.supports(ProtocolFeature::NamedValues));
        assert!(!Version::V4.supports(ProtocolFeature::KeyspaceInRequest));
        assert!(Version::V5.supports(ProtocolFeature::NowInSeconds));

        assert!(matches!(
            Version::V2.check(ProtocolFeature::DefaultTimestamp),
            Err(error::Error::UnsupportedFeature {
                feature: ProtocolFeature::DefaultTimestamp,
                version: Version::V2
            })
        ));
    }

    #[test]
    fn test_header_len() {
        assert_eq!(Version::V1.header_len(), 8);
        assert_eq!(Version::V2.header_len(), 8);
        assert_eq!(Version::V3.header_len(), 9);
        assert_eq!(Version::V5.header_len(), 9);
    }

    #[test]
    fn test_write_options_frame() {
        assert_eq!(
            write_frame(3, &RequestBody::Options, Version::V2).unwrap(),
            vec![0x02, 0x00, 0x03, 0x05, 0, 0, 0, 0]
        );
        assert_eq!(
            write_frame(0x0102, &RequestBody::Options, Version::V4).unwrap(),
            vec![0x04, 0x00, 0x01, 0x02, 0x05, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_write_frame_rejects_wide_stream_on_v1() {
        assert!(matches!(
            write_frame(300, &RequestBody::Options, Version::V1),
            Err(error::Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_write_frame_gates_before_encoding() {
        let params = QueryParams {
            consistency: Consistency::One,
            timestamp: Some(1),
            ..Default::default()
        };
        let query = RequestBody::Query(BodyReqQuery::new("SELECT 1".into(), params));

        assert!(matches!(
            write_frame(1, &query, Version::V2),
            Err(error::Error::UnsupportedFeature {
                feature: ProtocolFeature::DefaultTimestamp,
                version: Version::V2
            })
        ));
        assert!(write_frame(1, &query, Version::V3).is_ok());
    }

    #[test]
    fn test_read_ready_frame() {
        let bytes = [0x84, 0, 0, 7, 0x02, 0, 0, 0, 0];
        let response = read_frame(&bytes).unwrap();

        assert_eq!(response.version, Version::V4);
        assert_eq!(response.stream_id, 7);
        assert_eq!(response.body, ResponseBody::Ready);
    }

    #[test]
    fn test_read_v1_negative_stream() {
        let bytes = [0x81, 0, 0xFF, 0x02, 0, 0, 0, 0];
        let response = read_frame(&bytes).unwrap();

        assert_eq!(response.stream_id, EVENT_STREAM_ID);
    }

    #[test]
    fn test_read_frame_with_tracing_and_warnings() {
        let tracing_id = Uuid::from_u128(0x0102030405060708090a0b0c0d0e0f10);

        let mut bytes = vec![0x84, (Flags::TRACING | Flags::WARNING).bits(), 0, 1, 0x08];
        let mut body = tracing_id.as_bytes().to_vec();
        body.extend_from_slice(&[0, 1, 0, 4, b'w', b'a', b'r', b'n']);
        body.extend_from_slice(&[0, 0, 0, 1]);
        bytes.extend_from_slice(&(body.len() as i32).to_be_bytes());
        bytes.extend_from_slice(&body);

        let response = read_frame(&bytes).unwrap();
        assert_eq!(response.tracing_id, Some(tracing_id));
        assert_eq!(response.warnings, vec!["warn".to_string()]);
        assert_eq!(
            response.body,
            ResponseBody::Result(crate::frame::message_result::ResResultBody::Void)
        );
    }

    #[test]
    fn test_read_frame_rejects_truncated_body() {
        let bytes = [0x84, 0, 0, 1, 0x02, 0, 0, 0, 4, 1];
        assert!(read_frame(&bytes).is_err());
    }

    #[test]
    fn test_read_frame_rejects_request_opcode() {
        let bytes = [0x84, 0, 0, 1, 0x07, 0, 0, 0, 0];
        assert!(matches!(
            read_frame(&bytes),
            Err(error::Error::NonResponseOpcode(Opcode::Query))
        ));
    }

    #[test]
    fn test_request_and_response_frames_round_trip() {
        let query = RequestBody::Query(BodyReqQuery::new(
            "SELECT 1".into(),
            QueryParams {
                consistency: Consistency::Two,
                ..Default::default()
            },
        ));
        let bytes = write_frame(9, &query, Version::V3).unwrap();
        let (header, decoded) = read_request_frame(&bytes).unwrap();
        assert_eq!(header.stream_id, 9);
        assert_eq!(header.direction, Direction::Request);
        assert_eq!(decoded, query);

        let bytes = write_response_frame(9, &ResponseBody::Ready, Version::V3).unwrap();
        let response = read_frame(&bytes).unwrap();
        assert_eq!(response.stream_id, 9);
        assert_eq!(response.opcode(), Opcode::Ready);
    }

    #[test]
    fn test_batch_frame_round_trip() {
        use crate::frame::message_batch::{BatchQuery, BatchQuerySubj, BatchType, BodyReqBatch};
        use crate::query::QueryValues;
        use crate::types::value::Value;
        use crate::types::CBytesShort;

        let batch = RequestBody::Batch(BodyReqBatch::new(
            BatchType::Logged,
            vec![
                BatchQuery::new(
                    BatchQuerySubj::QueryString("INSERT INTO t (k) VALUES (?)".into()),
                    QueryValues::SimpleValues(vec![Value::new(1i32)]),
                ),
                BatchQuery::new(
                    BatchQuerySubj::PreparedId(CBytesShort::new(vec![0xAB, 0xCD])),
                    QueryValues::SimpleValues(vec![Value::new(2i32), Value::Null]),
                ),
                BatchQuery::new(
                    BatchQuerySubj::QueryString("DELETE FROM t WHERE k = 3".into()),
                    QueryValues::SimpleValues(vec![]),
                ),
            ],
            Consistency::Quorum,
            None,
            Some(1_000),
            None,
            None,
        ));

        let bytes = write_frame(5, &batch, Version::V4).unwrap();
        let (header, decoded) = read_request_frame(&bytes).unwrap();
        assert_eq!(header.opcode, Opcode::Batch);
        assert_eq!(header.stream_id, 5);

        match &decoded {
            RequestBody::Batch(body) => {
                assert_eq!(body.batch_type, BatchType::Logged);
                assert_eq!(body.queries.len(), 3);
                assert_eq!(body.consistency, Consistency::Quorum);
            }
            request => panic!("Unexpected request: {request:?}"),
        }
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_write_tracing_flag() {
        let query = RequestBody::Query(BodyReqQuery::new(
            "SELECT 1".into(),
            QueryParams {
                tracing: true,
                ..Default::default()
            },
        ));
        let bytes = write_frame(1, &query, Version::V4).unwrap();
        assert_eq!(bytes[1], Flags::TRACING.bits());
    }
}
