use std::io::Cursor;

use crate::consistency::Consistency;
use crate::error;
use crate::frame::message_auth_response::BodyReqAuthResponse;
use crate::frame::message_batch::BodyReqBatch;
use crate::frame::message_credentials::BodyReqCredentials;
use crate::frame::message_execute::BodyReqExecute;
use crate::frame::message_prepare::BodyReqPrepare;
use crate::frame::message_query::BodyReqQuery;
use crate::frame::message_register::BodyReqRegister;
use crate::frame::message_startup::BodyReqStartup;
use crate::frame::{FromCursor, Opcode, ProtocolFeature, Serialize, Version};
use crate::Error;

#[derive(Debug, PartialEq, Eq, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum RequestBody {
    Startup(BodyReqStartup),
    Credentials(BodyReqCredentials),
    Options,
    Query(BodyReqQuery),
    Prepare(BodyReqPrepare),
    Execute(BodyReqExecute),
    Register(BodyReqRegister),
    Batch(BodyReqBatch),
    AuthResponse(BodyReqAuthResponse),
}

impl Serialize for RequestBody {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        match self {
            RequestBody::Startup(body) => body.serialize(cursor, version),
            RequestBody::Credentials(body) => body.serialize(cursor, version),
            RequestBody::Options => {}
            RequestBody::Query(body) => body.serialize(cursor, version),
            RequestBody::Prepare(body) => body.serialize(cursor, version),
            RequestBody::Execute(body) => body.serialize(cursor, version),
            RequestBody::Register(body) => body.serialize(cursor, version),
            RequestBody::Batch(body) => body.serialize(cursor, version),
            RequestBody::AuthResponse(body) => body.serialize(cursor, version),
        }
    }
}

impl RequestBody {
    pub fn opcode(&self) -> Opcode {
        match self {
            RequestBody::Startup(_) => Opcode::Startup,
            RequestBody::Credentials(_) => Opcode::Credentials,
            RequestBody::Options => Opcode::Options,
            RequestBody::Query(_) => Opcode::Query,
            RequestBody::Prepare(_) => Opcode::Prepare,
            RequestBody::Execute(_) => Opcode::Execute,
            RequestBody::Register(_) => Opcode::Register,
            RequestBody::Batch(_) => Opcode::Batch,
            RequestBody::AuthResponse(_) => Opcode::AuthResponse,
        }
    }

    /// Verifies the request can be expressed in `version` without producing any bytes.
    pub fn check_version(&self, version: Version) -> error::Result<()> {
        match self {
            RequestBody::Credentials(_) => version.check(ProtocolFeature::Credentials),
            RequestBody::AuthResponse(_) => version.check(ProtocolFeature::AuthResponse),
            RequestBody::Query(body) => body.check_version(version),
            RequestBody::Prepare(body) => body.check_version(version),
            RequestBody::Execute(body) => body.check_version(version),
            RequestBody::Batch(body) => body.check_version(version),
            RequestBody::Startup(_) | RequestBody::Options | RequestBody::Register(_) => Ok(()),
        }
    }

    /// Consistency of QUERY, EXECUTE and BATCH requests.
    pub fn consistency(&self) -> Option<Consistency> {
        match self {
            RequestBody::Query(body) => Some(body.query_params.consistency),
            RequestBody::Execute(body) => Some(body.query_params.consistency),
            RequestBody::Batch(body) => Some(body.consistency),
            _ => None,
        }
    }

    /// Replaces the consistency of QUERY, EXECUTE and BATCH requests. Other requests carry no
    /// consistency and are left untouched.
    pub fn set_consistency(&mut self, consistency: Consistency) {
        match self {
            RequestBody::Query(body) => body.query_params.consistency = consistency,
            RequestBody::Execute(body) => body.query_params.consistency = consistency,
            RequestBody::Batch(body) => body.consistency = consistency,
            _ => {}
        }
    }

    #[inline]
    pub fn is_tracing(&self) -> bool {
        match self {
            RequestBody::Query(body) => body.query_params.tracing,
            RequestBody::Execute(body) => body.query_params.tracing,
            RequestBody::Batch(body) => body.tracing,
            _ => false,
        }
    }

    /// Decodes a request body, as a server would.
    pub fn try_from(bytes: &[u8], opcode: Opcode, version: Version) -> error::Result<RequestBody> {
        let mut cursor: Cursor<&[u8]> = Cursor::new(bytes);
        match opcode {
            Opcode::Startup => {
                BodyReqStartup::from_cursor(&mut cursor, version).map(RequestBody::Startup)
            }
            Opcode::Credentials => BodyReqCredentials::from_cursor(&mut cursor, version)
                .map(RequestBody::Credentials),
            Opcode::Options => Ok(RequestBody::Options),
            Opcode::Query => {
                BodyReqQuery::from_cursor(&mut cursor, version).map(RequestBody::Query)
            }
            Opcode::Prepare => {
                BodyReqPrepare::from_cursor(&mut cursor, version).map(RequestBody::Prepare)
            }
            Opcode::Execute => {
                BodyReqExecute::from_cursor(&mut cursor, version).map(RequestBody::Execute)
            }
            Opcode::Register => {
                BodyReqRegister::from_cursor(&mut cursor, version).map(RequestBody::Register)
            }
            Opcode::Batch => {
                BodyReqBatch::from_cursor(&mut cursor, version).map(RequestBody::Batch)
            }
            Opcode::AuthResponse => BodyReqAuthResponse::from_cursor(&mut cursor, version)
                .map(RequestBody::AuthResponse),
            _ => Err(Error::NonRequestOpcode(opcode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CBytes;

    #[test]
    fn should_gate_authentication_bodies() {
        let credentials = RequestBody::Credentials(BodyReqCredentials::plain_text("u", "p"));
        assert!(credentials.check_version(Version::V1).is_ok());
        assert!(credentials.check_version(Version::V2).is_err());

        let auth = RequestBody::AuthResponse(BodyReqAuthResponse::new(CBytes::new(vec![])));
        assert!(auth.check_version(Version::V1).is_err());
        assert!(auth.check_version(Version::V2).is_ok());
    }

    #[test]
    fn should_replace_consistency() {
        let mut query = RequestBody::Query(BodyReqQuery::new("SELECT".into(), Default::default()));
        query.set_consistency(Consistency::Two);
        assert_eq!(query.consistency(), Some(Consistency::Two));

        let mut options = RequestBody::Options;
        options.set_consistency(Consistency::Two);
        assert_eq!(options.consistency(), None);
    }

    #[test]
    fn should_decode_request_bodies() {
        let prepare = RequestBody::Prepare(BodyReqPrepare::new("SELECT".into(), None));
        let bytes = prepare.serialize_to_vec(Version::V4);

        assert_eq!(
            RequestBody::try_from(&bytes, Opcode::Prepare, Version::V4).unwrap(),
            prepare
        );
        assert!(matches!(
            RequestBody::try_from(&[], Opcode::Ready, Version::V4),
            Err(Error::NonRequestOpcode(Opcode::Ready))
        ));
    }
}
