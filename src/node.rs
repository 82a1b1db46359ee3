/// A single physical connection: one master or one slave of one shard.
///
/// The node owns its connection configuration and lifecycle and exposes a
/// thin execute boundary; once opened, the connection handle is immutable
/// and reconfiguration means constructing a new node.
use crate::client::{ClientConn, Connector, PoolLimits};
use crate::error::{ClusterError, ClusterResult};
use crate::key::KeyValue;
use crate::selector::{SuffixSelector, TableSelector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

const DEFAULT_DRIVER: &str = "mysql";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_MAX_IDLE_CONNS: u32 = 200;
const DEFAULT_MAX_OPEN_CONNS: u32 = 200;
const DEFAULT_CONN_MAX_LIFETIME_SECS: u64 = 60;

/// Connection settings for one physical database. Zero/empty fields fall
/// back to the defaults above when the connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    pub driver: String,
    /// Explicit data-source string; when set it wins over the discrete
    /// host/credential fields.
    pub dsn: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub conn_max_lifetime_secs: u64,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            driver: String::new(),
            dsn: String::new(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            max_idle_conns: 0,
            max_open_conns: 0,
            conn_max_lifetime_secs: 0,
        }
    }
}

impl DataSource {
    pub fn effective_driver(&self) -> &str {
        if self.driver.is_empty() {
            DEFAULT_DRIVER
        } else {
            &self.driver
        }
    }

    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// The data-source string handed to the client: the explicit `dsn` when
    /// given, otherwise assembled from the discrete fields with fixed
    /// charset/timezone query parameters.
    pub fn effective_dsn(&self) -> String {
        if !self.dsn.is_empty() {
            return self.dsn.clone();
        }
        format!(
            "{}:{}@tcp({}:{})/{}?charset=utf8&parseTime=true&loc=Local",
            self.username,
            self.password,
            self.host,
            self.effective_port(),
            self.database,
        )
    }

    pub fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            max_idle_conns: if self.max_idle_conns == 0 {
                DEFAULT_MAX_IDLE_CONNS
            } else {
                self.max_idle_conns
            },
            max_open_conns: if self.max_open_conns == 0 {
                DEFAULT_MAX_OPEN_CONNS
            } else {
                self.max_open_conns
            },
            conn_max_lifetime_secs: if self.conn_max_lifetime_secs == 0 {
                DEFAULT_CONN_MAX_LIFETIME_SECS
            } else {
                self.conn_max_lifetime_secs
            },
        }
    }

    /// The same source pointed at one shard's physical database: with more
    /// than one database the name carries the shard suffix, e.g.
    /// `app_00000002`. An explicit DSN is left untouched.
    pub fn for_db_index(&self, db_count: usize, db_index: usize) -> DataSource {
        let mut source = self.clone();
        if db_count > 1 && source.dsn.is_empty() {
            source.database = format!("{}_{:08}", source.database, db_index);
        }
        source
    }

    /// Connection target without credentials, for logs and error messages.
    pub fn target(&self) -> String {
        if !self.dsn.is_empty() {
            return "<explicit dsn>".to_string();
        }
        format!("{}:{}/{}", self.host, self.effective_port(), self.database)
    }
}

/// Replica role within a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Master,
    Slave,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => write!(f, "master"),
            NodeRole::Slave => write!(f, "slave"),
        }
    }
}

pub struct PhysicalNode {
    source: DataSource,
    role: NodeRole,
    db_index: usize,
    table_count: u64,
    table_selector: Arc<dyn TableSelector>,
    conn: OnceLock<Arc<dyn ClientConn>>,
}

impl PhysicalNode {
    pub fn new(source: DataSource, role: NodeRole, db_index: usize, table_count: u64) -> Self {
        Self {
            source,
            role,
            db_index,
            table_count: table_count.max(1),
            table_selector: Arc::new(SuffixSelector),
            conn: OnceLock::new(),
        }
    }

    /// Replace the default suffix selector, e.g. with a range map.
    pub fn with_table_selector(mut self, selector: Arc<dyn TableSelector>) -> Self {
        self.table_selector = selector;
        self
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == NodeRole::Master
    }

    pub fn db_index(&self) -> usize {
        self.db_index
    }

    pub fn table_count(&self) -> u64 {
        self.table_count
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Node identity for logs and errors, e.g. `master/db2@10.0.1.5:3306/app_00000002`.
    pub fn label(&self) -> String {
        format!("{}/db{}@{}", self.role, self.db_index, self.source.target())
    }

    /// Open the underlying connection through the client boundary. Failure
    /// leaves the node unusable and may be retried; a successful second call
    /// is a no-op since the handle is write-once.
    pub async fn open(&self, connector: &dyn Connector) -> ClusterResult<()> {
        if self.conn.get().is_some() {
            return Ok(());
        }

        let dsn = self.source.effective_dsn();
        let pool = self.source.pool_limits();
        log::info!("opening {}", self.label());

        let conn = connector
            .connect(self.source.effective_driver(), &dsn, &pool)
            .await
            .map_err(|e| {
                log::warn!("failed to open {}: {}", self.label(), e);
                ClusterError::Client(e)
            })?;

        // Lost race against a concurrent opener: keep the first handle.
        let _ = self.conn.set(conn);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.get().is_some()
    }

    pub fn conn(&self) -> ClusterResult<&Arc<dyn ClientConn>> {
        self.conn.get().ok_or_else(|| ClusterError::NotOpen {
            node: self.label(),
        })
    }

    /// Resolve the physical table name for this node from the logical base
    /// name and the request's sharding key values.
    pub fn resolve_table(&self, base: &str, values: &[KeyValue]) -> ClusterResult<String> {
        self.table_selector
            .resolve(base, self.table_count, self.db_index, values)
    }
}

impl fmt::Debug for PhysicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalNode")
            .field("role", &self.role)
            .field("db_index", &self.db_index)
            .field("table_count", &self.table_count)
            .field("target", &self.source.target())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(host: &str, database: &str) -> DataSource {
        DataSource {
            username: "app".to_string(),
            password: "secret".to_string(),
            host: host.to_string(),
            database: database.to_string(),
            ..DataSource::default()
        }
    }

    #[test]
    fn test_dsn_assembly() {
        let ds = source("10.0.1.5", "app");
        assert_eq!(
            ds.effective_dsn(),
            "app:secret@tcp(10.0.1.5:3306)/app?charset=utf8&parseTime=true&loc=Local"
        );
    }

    #[test]
    fn test_explicit_dsn_wins() {
        let ds = DataSource {
            dsn: "app:x@tcp(db:3307)/other".to_string(),
            ..source("ignored", "ignored")
        };
        assert_eq!(ds.effective_dsn(), "app:x@tcp(db:3307)/other");
    }

    #[test]
    fn test_pool_and_port_defaults() {
        let ds = DataSource::default();
        assert_eq!(ds.effective_driver(), "mysql");
        assert_eq!(ds.effective_port(), 3306);
        let pool = ds.pool_limits();
        assert_eq!(pool.max_idle_conns, 200);
        assert_eq!(pool.max_open_conns, 200);
        assert_eq!(pool.conn_max_lifetime_secs, 60);

        let ds = DataSource {
            port: 3307,
            max_open_conns: 50,
            conn_max_lifetime_secs: 5,
            ..DataSource::default()
        };
        assert_eq!(ds.effective_port(), 3307);
        let pool = ds.pool_limits();
        assert_eq!(pool.max_idle_conns, 200);
        assert_eq!(pool.max_open_conns, 50);
        assert_eq!(pool.conn_max_lifetime_secs, 5);
    }

    #[test]
    fn test_database_name_suffixing() {
        let ds = source("h", "app");
        assert_eq!(ds.for_db_index(4, 2).database, "app_00000002");
        // a single database keeps its plain name
        assert_eq!(ds.for_db_index(1, 0).database, "app");
        // explicit DSNs are never rewritten
        let explicit = DataSource {
            dsn: "x".to_string(),
            ..source("h", "app")
        };
        assert_eq!(explicit.for_db_index(4, 2).database, "app");
    }

    #[test]
    fn test_target_hides_credentials() {
        let ds = source("10.0.1.5", "app");
        let target = ds.target();
        assert_eq!(target, "10.0.1.5:3306/app");
        assert!(!target.contains("secret"));
    }

    #[test]
    fn test_node_accessors_and_resolution() {
        let node = PhysicalNode::new(source("h", "app"), NodeRole::Master, 2, 4);
        assert!(node.is_master());
        assert_eq!(node.db_index(), 2);
        assert_eq!(node.table_count(), 4);
        assert!(!node.is_open());
        assert!(node.conn().is_err());

        let table = node.resolve_table("orders", &[KeyValue::Int(13)]).unwrap();
        assert_eq!(table, "orders_00000009");

        let err = node.resolve_table("orders", &[]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
    }

    #[test]
    fn test_table_count_floor() {
        let node = PhysicalNode::new(DataSource::default(), NodeRole::Slave, 0, 0);
        assert_eq!(node.table_count(), 1);
        assert_eq!(node.resolve_table("t", &[]).unwrap(), "t");
    }

    #[test]
    fn test_label() {
        let node = PhysicalNode::new(source("db1", "app"), NodeRole::Slave, 3, 1);
        assert_eq!(node.label(), "slave/db3@db1:3306/app");
    }
}
