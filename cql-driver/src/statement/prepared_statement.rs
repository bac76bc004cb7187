use crate::types::CBytesShort;

/// Result of preparing a query. Executing it requires only the server-side id, but the query
/// text and keyspace are kept, so a node which lost the statement can transparently re-prepare it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreparedStatement {
    pub(crate) id: CBytesShort,
    pub(crate) result_metadata_id: Option<CBytesShort>,
    pub(crate) query: String,
    pub(crate) keyspace: Option<String>,
}

impl PreparedStatement {
    pub fn new(
        id: CBytesShort,
        result_metadata_id: Option<CBytesShort>,
        query: String,
        keyspace: Option<String>,
    ) -> Self {
        PreparedStatement {
            id,
            result_metadata_id,
            query,
            keyspace,
        }
    }

    #[inline]
    pub fn id(&self) -> &CBytesShort {
        &self.id
    }

    /// Result metadata id returned by protocol V5 servers.
    #[inline]
    pub fn result_metadata_id(&self) -> Option<&CBytesShort> {
        self.result_metadata_id.as_ref()
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}
