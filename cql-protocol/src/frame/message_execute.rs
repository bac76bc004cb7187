use std::io::Cursor;

use derive_more::Constructor;

use crate::consistency::Consistency;
use crate::error;
use crate::frame::{FromCursor, Serialize, Version};
use crate::query::{QueryParams, QueryValues};
use crate::types::CBytesShort;

/// EXECUTE body. V1 writes `<id><n><values><consistency>`, V2+ the id followed by the query
/// parameters, and V5 adds the result metadata id in between.
#[derive(Debug, Constructor, Clone, Eq, PartialEq, Default)]
pub struct BodyReqExecute {
    pub id: CBytesShort,
    pub result_metadata_id: Option<CBytesShort>,
    pub query_params: QueryParams,
}

impl BodyReqExecute {
    #[inline]
    pub fn check_version(&self, version: Version) -> error::Result<()> {
        self.query_params.check_version(version)
    }
}

impl Serialize for BodyReqExecute {
    fn serialize(&self, cursor: &mut Cursor<&mut Vec<u8>>, version: Version) {
        self.id.serialize(cursor, version);

        if version == Version::V1 {
            self.query_params.serialize_values(cursor, version);
            self.query_params.consistency.serialize(cursor, version);
            return;
        }

        if version >= Version::V5 {
            match &self.result_metadata_id {
                Some(id) => id.serialize(cursor, version),
                None => CBytesShort::new(vec![]).serialize(cursor, version),
            }
        }

        self.query_params.serialize(cursor, version);
    }
}

impl FromCursor for BodyReqExecute {
    fn from_cursor(cursor: &mut Cursor<&[u8]>, version: Version) -> error::Result<Self> {
        let id = CBytesShort::from_cursor(cursor, version)?;

        if version == Version::V1 {
            let count = u16::from_cursor(cursor, version)?;
            let values = QueryValues::from_cursor_with_count(cursor, count, false, version)?;
            let consistency = Consistency::from_cursor(cursor, version)?;

            return Ok(BodyReqExecute::new(
                id,
                None,
                QueryParams {
                    consistency,
                    values: Some(values),
                    ..Default::default()
                },
            ));
        }

        let result_metadata_id = if version >= Version::V5 {
            Some(CBytesShort::from_cursor(cursor, version)?)
        } else {
            None
        };

        let query_params = QueryParams::from_cursor(cursor, version)?;

        Ok(BodyReqExecute::new(id, result_metadata_id, query_params))
    }
}
