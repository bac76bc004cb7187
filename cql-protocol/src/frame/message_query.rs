use std::io::Cursor;

use derive_more::Constructor;

use crate::consistency::Consistency;
use crate::error;
use crate::frame::{FromCursor, ProtocolFeature, Serialize, Version};
use crate::query::QueryParams;
use crate::types::{from_cursor_str_long, serialize_str_long, INT_LEN};

/// QUERY body. V1 carries only the query string and consistency.
#[derive(Debug, PartialEq, Eq, Clone, Default, Constructor)]
pub struct BodyReqQuery {
    pub query: String,
    pub query_params: QueryParams,
}

impl BodyReqQuery {
    pub fn check_version(&self, version: Version) -> error::Result<()> {
        if version == Version::V1
            && self
                .query_params
                .values
                .as_ref()
                .map(|values| !values.is_empty())
                .unwrap_or(false)
        {
            version.check(ProtocolFeature::QueryValues)?;
        }

        self.query_params.check_version(version)
    }
}

impl FromCursor for BodyReqQuery {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<BodyReqQuery> {
        let query = from_cursor_str_long(cursor)?.to_string();
        let query_params = if version == Version::V1 {
            QueryParams {
                consistency: Consistency::from_cursor(cursor, version)?,
                ..Default::default()
            }
        } else {
            QueryParams::from_cursor(cursor, version)?
        };

        Ok(BodyReqQuery {
            query,
            query_params,
        })
    }
}

impl Serialize for BodyReqQuery {
    #[inline]
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        serialize_str_long(cursor, &self.query, version);

        if version == Version::V1 {
            self.query_params.consistency.serialize(cursor, version);
        } else {
            self.query_params.serialize(cursor, version);
        }
    }

    #[inline]
    fn serialize_to_vec(&self, version: Version) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INT_LEN + self.query.len());

        self.serialize(&mut Cursor::new(&mut buf), version);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryValues;
    use crate::types::value::Value;

    fn query(params: QueryParams) -> BodyReqQuery {
        BodyReqQuery::new("SELECT".into(), params)
    }

    #[test]
    fn should_encode_v1_query() {
        let body = query(QueryParams {
            consistency: Consistency::All,
            ..Default::default()
        });

        assert_eq!(
            body.serialize_to_vec(Version::V1),
            vec![0, 0, 0, 6, b'S', b'E', b'L', b'E', b'C', b'T', 0, 5]
        );
        assert!(body.check_version(Version::V1).is_ok());
    }

    #[test]
    fn should_reject_values_on_v1() {
        let body = query(QueryParams {
            values: Some(QueryValues::SimpleValues(vec![Value::new(1i32)])),
            ..Default::default()
        });

        assert!(matches!(
            body.check_version(Version::V1),
            Err(error::Error::UnsupportedFeature {
                feature: ProtocolFeature::QueryValues,
                version: Version::V1
            })
        ));
        assert!(body.check_version(Version::V2).is_ok());
    }

    #[test]
    fn should_decode_what_was_encoded() {
        let body = query(QueryParams {
            consistency: Consistency::LocalQuorum,
            values: Some(QueryValues::SimpleValues(vec![Value::Null])),
            page_size: Some(10),
            ..Default::default()
        });

        for version in [Version::V2, Version::V4, Version::V5] {
            let bytes = body.serialize_to_vec(version);
            let mut cursor: Cursor<&[u8]> = Cursor::new(&bytes);
            assert_eq!(BodyReqQuery::from_cursor(&mut cursor, version).unwrap(), body);
        }
    }
}
