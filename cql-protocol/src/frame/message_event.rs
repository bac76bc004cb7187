use std::io::Cursor;

use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::types::{
    from_cursor_str, from_cursor_string_list, serialize_str, serialize_str_list,
};

const SCHEMA_CHANGE: &str = "SCHEMA_CHANGE";

/// Server-pushed EVENT. Only the event type is decoded; the payload stays raw except for schema
/// changes, which share their layout with the schema change result.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BodyResEvent {
    pub event_type: String,
    pub schema_change: Option<SchemaChange>,
    pub raw: Vec<u8>,
}

impl Serialize for BodyResEvent {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str(cursor, &self.event_type, version);
        self.raw.serialize(cursor, version);
    }
}

impl FromCursor for BodyResEvent {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<BodyResEvent> {
        let event_type = from_cursor_str(cursor)?.to_string();

        let position = cursor.position() as usize;
        let raw = cursor.get_ref()[position..].to_vec();

        let schema_change = if event_type == SCHEMA_CHANGE {
            Some(SchemaChange::from_cursor(cursor, version)?)
        } else {
            None
        };

        Ok(BodyResEvent {
            event_type,
            schema_change,
            raw,
        })
    }
}

/// Description of a schema modification.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct SchemaChange {
    /// `CREATED`, `UPDATED` or `DROPPED`.
    pub change_type: String,
    /// `KEYSPACE`, `TABLE`, `TYPE`, `FUNCTION` or `AGGREGATE`.
    pub target: String,
    pub keyspace: String,
    /// Name of the changed object, absent for keyspace changes.
    pub name: Option<String>,
    /// Argument types of changed functions and aggregates.
    pub arguments: Vec<String>,
}

impl Serialize for SchemaChange {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str(cursor, &self.change_type, version);

        if version < Version::V3 {
            serialize_str(cursor, &self.keyspace, version);
            serialize_str(cursor, self.name.as_deref().unwrap_or_default(), version);
            return;
        }

        serialize_str(cursor, &self.target, version);
        serialize_str(cursor, &self.keyspace, version);

        if let Some(name) = &self.name {
            serialize_str(cursor, name, version);
        }

        if matches!(self.target.as_str(), "FUNCTION" | "AGGREGATE") {
            serialize_str_list(cursor, self.arguments.iter().map(String::as_str), version);
        }
    }
}

impl FromCursor for SchemaChange {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<SchemaChange> {
        let change_type = from_cursor_str(cursor)?.to_string();

        if version < Version::V3 {
            let keyspace = from_cursor_str(cursor)?.to_string();
            let table = from_cursor_str(cursor)?;

            let (target, name) = if table.is_empty() {
                ("KEYSPACE".to_string(), None)
            } else {
                ("TABLE".to_string(), Some(table.to_string()))
            };

            return Ok(SchemaChange {
                change_type,
                target,
                keyspace,
                name,
                arguments: vec![],
            });
        }

        let target = from_cursor_str(cursor)?.to_string();
        let keyspace = from_cursor_str(cursor)?.to_string();

        let (name, arguments) = match target.as_str() {
            "KEYSPACE" => (None, vec![]),
            "FUNCTION" | "AGGREGATE" => (
                Some(from_cursor_str(cursor)?.to_string()),
                from_cursor_string_list(cursor)?,
            ),
            _ => (Some(from_cursor_str(cursor)?.to_string()), vec![]),
        };

        Ok(SchemaChange {
            change_type,
            target,
            keyspace,
            name,
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_bytes(value: &str) -> Vec<u8> {
        let mut bytes = (value.len() as u16).to_be_bytes().to_vec();
        bytes.extend_from_slice(value.as_bytes());
        bytes
    }

    #[test]
    fn should_decode_v1_table_change() {
        let bytes = [str_bytes("CREATED"), str_bytes("ks"), str_bytes("users")].concat();
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        let change = SchemaChange::from_cursor(&mut cursor, Version::V1).unwrap();
        assert_eq!(change.target, "TABLE");
        assert_eq!(change.name.as_deref(), Some("users"));
        assert_eq!(change.serialize_to_vec(Version::V1), bytes);
    }

    #[test]
    fn should_decode_v3_function_change() {
        let bytes = [
            str_bytes("DROPPED"),
            str_bytes("FUNCTION"),
            str_bytes("ks"),
            str_bytes("f"),
            vec![0, 1],
            str_bytes("int"),
        ]
        .concat();
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        let change = SchemaChange::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(change.arguments, vec!["int".to_string()]);
        assert_eq!(change.serialize_to_vec(Version::V4), bytes);
    }

    #[test]
    fn should_keep_raw_event_payload() {
        let bytes = [str_bytes("STATUS_CHANGE"), str_bytes("UP"), vec![4, 127, 0, 0, 1]].concat();
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        let event = BodyResEvent::from_cursor(&mut cursor, Version::V4).unwrap();
        assert_eq!(event.event_type, "STATUS_CHANGE");
        assert!(event.schema_change.is_none());
        assert_eq!(event.serialize_to_vec(Version::V4), bytes);
    }

    #[test]
    fn should_decode_schema_change_event() {
        let bytes = [
            str_bytes("SCHEMA_CHANGE"),
            str_bytes("CREATED"),
            str_bytes("KEYSPACE"),
            str_bytes("ks"),
        ]
        .concat();
        let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);

        let event = BodyResEvent::from_cursor(&mut cursor, Version::V5).unwrap();
        let change = event.schema_change.unwrap();
        assert_eq!(change.keyspace, "ks");
        assert_eq!(change.name, None);
    }
}
