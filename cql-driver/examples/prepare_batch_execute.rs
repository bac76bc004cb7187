use cql_driver::cluster::{Session, SessionConfigBuilder, TopologyMetadata};
use cql_driver::consistency::Consistency;
use cql_driver::frame::message_batch::BatchType;
use cql_driver::query::QueryValues;
use cql_driver::statement::{BatchStatement, PreparedStatement, StatementBuilder};
use cql_driver::types::value::Value;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
struct RowStruct {
    key: i32,
}

impl RowStruct {
    fn into_query_values(self) -> QueryValues {
        // **IMPORTANT NOTE:** query values should be WITHOUT NAMES
        // https://github.com/apache/cassandra/blob/trunk/doc/native_protocol_v4.spec#L413
        QueryValues::SimpleValues(vec![Value::new(self.key)])
    }
}

#[tokio::main]
async fn main() {
    let cluster = Arc::new(TopologyMetadata::with_contact_points([
        "127.0.0.1:9042".parse().unwrap()
    ]));
    let session = Session::new(SessionConfigBuilder::new().build(), cluster);

    create_keyspace(&session).await;
    create_table(&session).await;

    let insert_struct_cql = "INSERT INTO test_ks.my_test_table (key) VALUES (?)";
    let prepared_query = session
        .prepare(insert_struct_cql)
        .await
        .expect("Prepare query error");

    for k in 100..110 {
        let row = RowStruct { key: k };

        insert_row(&session, row, &prepared_query).await;
    }

    batch_few_queries(&session, insert_struct_cql).await;
}

async fn create_keyspace(session: &Session) {
    let create_ks: &'static str = "CREATE KEYSPACE IF NOT EXISTS test_ks WITH REPLICATION = { \
                                   'class' : 'SimpleStrategy', 'replication_factor' : 1 };";
    session
        .query(create_ks)
        .await
        .expect("Keyspace creation error");
}

async fn create_table(session: &Session) {
    let create_table_cql =
        "CREATE TABLE IF NOT EXISTS test_ks.my_test_table (key int PRIMARY KEY);";
    session
        .query(create_table_cql)
        .await
        .expect("Table creation error");
}

async fn insert_row(session: &Session, row: RowStruct, prepared_query: &Arc<PreparedStatement>) {
    // inserting the same key twice has the same effect, so the insert can be sent speculatively
    let statement = StatementBuilder::bound(prepared_query.clone())
        .with_values(row.into_query_values())
        .with_consistency(Consistency::One)
        .with_idempotent(true)
        .build();

    session.execute(statement).await.expect("Execute error");
}

async fn batch_few_queries(session: &Session, query: &str) {
    let prepared_query = session.prepare(query).await.expect("Prepare query error");
    let row_1 = RowStruct { key: 1001 };
    let row_2 = RowStruct { key: 2001 };

    let batch = StatementBuilder::batch(BatchType::Logged)
        .add_statement(BatchStatement::Bound {
            prepared: prepared_query,
            values: row_1.into_query_values(),
        })
        .add_statement(BatchStatement::Simple {
            query: query.to_string(),
            values: row_2.into_query_values(),
        })
        .build();

    session.execute(batch).await.expect("Batch query error");
}
