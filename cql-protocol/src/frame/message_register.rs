use std::convert::TryFrom;
use std::io::Cursor;

use derive_more::{Constructor, Display};
use itertools::Itertools;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{from_cursor_string_list, serialize_str_list};

/// Kind of server push the client can subscribe to.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Display)]
pub enum ServerEventType {
    #[display("TOPOLOGY_CHANGE")]
    TopologyChange,
    #[display("STATUS_CHANGE")]
    StatusChange,
    #[display("SCHEMA_CHANGE")]
    SchemaChange,
}

impl ServerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerEventType::TopologyChange => "TOPOLOGY_CHANGE",
            ServerEventType::StatusChange => "STATUS_CHANGE",
            ServerEventType::SchemaChange => "SCHEMA_CHANGE",
        }
    }
}

impl TryFrom<&str> for ServerEventType {
    type Error = error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "TOPOLOGY_CHANGE" => Ok(ServerEventType::TopologyChange),
            "STATUS_CHANGE" => Ok(ServerEventType::StatusChange),
            "SCHEMA_CHANGE" => Ok(ServerEventType::SchemaChange),
            _ => Err(error::Error::General(format!("Unknown event type: {value}"))),
        }
    }
}

/// REGISTER body: the event types the connection should receive.
#[derive(Debug, Constructor, Default, Ord, PartialOrd, Eq, PartialEq, Hash, Clone)]
pub struct BodyReqRegister {
    pub events: Vec<ServerEventType>,
}

impl Serialize for BodyReqRegister {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        let events = self.events.iter().map(|event| event.as_str());
        serialize_str_list(cursor, events, version);
    }
}

impl FromCursor for BodyReqRegister {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, _version: Version) -> error::Result<Self> {
        let events = from_cursor_string_list(cursor)?;
        events
            .iter()
            .map(|event| ServerEventType::try_from(event.as_str()))
            .try_collect()
            .map(BodyReqRegister::new)
    }
}
