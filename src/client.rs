/// The boundary to the external database client.
///
/// The routing layer never builds SQL, maps rows, or inspects query
/// contents; it resolves a physical table name and hands the operation to
/// these traits. Client errors cross the boundary unmodified.
use crate::error::ClientError;
use crate::key::KeyValue;
use async_trait::async_trait;
use std::sync::Arc;

/// A model value exposes its logical (unsharded) table name; the router
/// appends the shard suffix before delegating.
pub trait Model: Send + Sync {
    fn table_name(&self) -> &str;
}

/// Pool limits applied by the client when a connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub conn_max_lifetime_secs: u64,
}

/// Rows fetched by a raw query, returned without interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub values: Vec<Vec<KeyValue>>,
}

/// Opens physical connections. Implemented by the embedding application on
/// top of its database driver.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        driver: &str,
        dsn: &str,
        pool: &PoolLimits,
    ) -> Result<Arc<dyn ClientConn>, ClientError>;
}

/// One open physical connection. Every method is bound to an already
/// resolved physical table name where one applies; write methods report the
/// affected row count, read methods scan into the caller's model or return
/// raw rows.
#[async_trait]
pub trait ClientConn: Send + Sync {
    async fn create(&self, table: &str, model: &dyn Model) -> Result<u64, ClientError>;

    /// Update the value, inserting it when it has no primary key yet.
    async fn save(&self, table: &str, model: &dyn Model) -> Result<u64, ClientError>;

    async fn delete(&self, table: &str, model: &dyn Model) -> Result<u64, ClientError>;

    async fn updates(&self, table: &str, model: &dyn Model) -> Result<u64, ClientError>;

    /// Update only the named columns.
    async fn update_columns(
        &self,
        table: &str,
        model: &dyn Model,
        columns: &[String],
    ) -> Result<u64, ClientError>;

    /// Scan all matching records into `out`, returning the match count.
    async fn find(&self, table: &str, out: &mut dyn Model) -> Result<u64, ClientError>;

    /// First matching record ordered by primary key.
    async fn first(&self, table: &str, out: &mut dyn Model) -> Result<(), ClientError>;

    /// Last matching record ordered by primary key.
    async fn last(&self, table: &str, out: &mut dyn Model) -> Result<(), ClientError>;

    /// Scan the pending query result into `out`.
    async fn scan(&self, table: &str, out: &mut dyn Model) -> Result<(), ClientError>;

    async fn count(&self, table: &str) -> Result<u64, ClientError>;

    /// Raw query; the SQL already names its tables, the router does not
    /// rewrite it.
    async fn query(&self, sql: &str, params: &[KeyValue]) -> Result<Rows, ClientError>;

    /// Raw exec, same contract as [`ClientConn::query`].
    async fn exec(&self, sql: &str, params: &[KeyValue]) -> Result<u64, ClientError>;

    async fn begin(&self) -> Result<(), ClientError>;

    async fn commit(&self) -> Result<(), ClientError>;

    async fn rollback(&self) -> Result<(), ClientError>;
}

impl Model for &'static str {
    fn table_name(&self) -> &str {
        self
    }
}
