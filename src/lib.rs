/// Reparto - deterministic shard, table, and replica routing for
/// partitioned SQL clusters.
///
/// Given a logical model and a set of sharding key values, the router
/// selects the physical database shard, the physical table suffix within
/// it, and the replica that serves the request: the master for writes, a
/// balanced slave for reads. Everything below that decision (SQL, mapping,
/// transactions) belongs to the embedding application's database client,
/// reached through the traits in [`client`].
pub mod balance;
pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod key;
pub mod node;
pub mod selector;
pub mod shard;

pub use balance::{Balancer, Random, RoundRobin};
pub use client::{ClientConn, Connector, Model, PoolLimits, Rows};
pub use cluster::{Cluster, ClusterOptions};
pub use config::{ClusterConfig, LoggingConfig, ShardConfig};
pub use error::{ClientError, ClusterError, ClusterResult, ConfigError};
pub use key::KeyValue;
pub use node::{DataSource, NodeRole, PhysicalNode};
pub use selector::{DbSelector, ModuloSelector, SuffixSelector, TableSelector};
pub use shard::{BoundShard, ShardGroup};
