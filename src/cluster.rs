/// Top-level router: owns the full shard list and the database selector,
/// and resolves a logical request to a bound shard handle.
use crate::balance::Balancer;
use crate::client::Connector;
use crate::config::ClusterConfig;
use crate::error::{ClusterError, ClusterResult, ConfigError};
use crate::key::KeyValue;
use crate::node::{DataSource, NodeRole, PhysicalNode};
use crate::selector::{DbSelector, ModuloSelector, TableSelector};
use crate::shard::{BoundShard, ShardGroup};
use std::sync::Arc;

/// Pluggable strategy overrides applied during cluster construction.
/// `None` fields keep the defaults: modulo database selection, suffix table
/// selection, round-robin read balancing.
#[derive(Default)]
pub struct ClusterOptions {
    pub db_selector: Option<Arc<dyn DbSelector>>,
    pub table_selector: Option<Arc<dyn TableSelector>>,
    pub balancer: Option<Arc<dyn Balancer>>,
}

pub struct Cluster {
    db_count: usize,
    table_count: u64,
    selector: Arc<dyn DbSelector>,
    shards: Vec<Arc<ShardGroup>>,
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("db_count", &self.db_count)
            .field("table_count", &self.table_count)
            .finish_non_exhaustive()
    }
}

impl Cluster {
    /// Assemble a cluster from already constructed shards. The shard list
    /// must match the database count exactly; a mismatch means some index
    /// the selector can produce has no shard, which is a setup error, not a
    /// runtime condition.
    pub fn new(
        db_count: usize,
        table_count: u64,
        shards: Vec<Arc<ShardGroup>>,
    ) -> ClusterResult<Self> {
        Self::with_selector(db_count, table_count, shards, Arc::new(ModuloSelector))
    }

    pub fn with_selector(
        db_count: usize,
        table_count: u64,
        shards: Vec<Arc<ShardGroup>>,
        selector: Arc<dyn DbSelector>,
    ) -> ClusterResult<Self> {
        let db_count = db_count.max(1);
        if shards.len() != db_count {
            return Err(ConfigError::ValidationError(format!(
                "{} shards configured for {} databases",
                shards.len(),
                db_count
            ))
            .into());
        }

        log::info!(
            "cluster assembled: {} databases, {} tables per database",
            db_count,
            table_count.max(1)
        );

        Ok(Self {
            db_count,
            table_count: table_count.max(1),
            selector,
            shards,
        })
    }

    /// Expand a declarative configuration into one shard per database
    /// index, with the default strategies.
    pub fn from_config(config: &ClusterConfig) -> ClusterResult<Self> {
        Self::from_config_with(config, ClusterOptions::default())
    }

    /// As [`Cluster::from_config`] with custom selector/balancer strategies.
    pub fn from_config_with(config: &ClusterConfig, opts: ClusterOptions) -> ClusterResult<Self> {
        config.validate()?;

        let db_count = config.effective_db_count();
        let table_count = config.effective_table_count();

        let mut shards = Vec::with_capacity(db_count);
        if config.shards.is_empty() {
            for db_index in 0..db_count {
                shards.push(Arc::new(build_shard(
                    db_index,
                    db_count,
                    table_count,
                    &config.source,
                    &config.slaves,
                    &opts,
                )));
            }
        } else {
            // validate() guarantees the overrides cover [0, db_count)
            // exactly once; order them by index so shard position equals
            // database index.
            let mut overrides: Vec<_> = config.shards.iter().collect();
            overrides.sort_by_key(|s| s.db_index);
            for shard in overrides {
                shards.push(Arc::new(build_shard(
                    shard.db_index,
                    db_count,
                    shard.table_count.unwrap_or(table_count),
                    &shard.source,
                    &shard.slaves,
                    &opts,
                )));
            }
        }

        let selector = opts
            .db_selector
            .unwrap_or_else(|| Arc::new(ModuloSelector));
        Self::with_selector(db_count, table_count, shards, selector)
    }

    pub fn db_count(&self) -> usize {
        self.db_count
    }

    pub fn table_count(&self) -> u64 {
        self.table_count
    }

    pub fn shards(&self) -> &[Arc<ShardGroup>] {
        &self.shards
    }

    /// Database index the given key values route to. Surfaces a loud error
    /// when the selector overruns the shard list instead of clamping: a
    /// silently wrong shard corrupts data.
    pub fn shard_index(&self, values: &[KeyValue]) -> ClusterResult<usize> {
        let index = self.selector.select(self.db_count, values)?;
        if index >= self.shards.len() {
            return Err(ClusterError::ShardIndexOutOfRange {
                index,
                shard_count: self.shards.len(),
            });
        }
        Ok(index)
    }

    /// Resolve the key values of one logical request to a bound shard
    /// handle; all table resolution on the handle uses these values.
    pub fn route(&self, values: Vec<KeyValue>) -> ClusterResult<BoundShard> {
        let index = self.shard_index(&values)?;
        log::debug!("routing to shard {} of {}", index, self.db_count);
        Ok(self.shards[index].bind(values))
    }

    /// Visit every shard in configured order, for cluster-wide
    /// administrative work such as running DDL everywhere.
    pub fn for_each_shard(&self, mut f: impl FnMut(&Arc<ShardGroup>)) {
        for shard in &self.shards {
            f(shard);
        }
    }

    /// Open every connection of every shard.
    pub async fn open_all(&self, connector: &dyn Connector) -> ClusterResult<()> {
        for shard in &self.shards {
            shard.open(connector).await?;
        }
        Ok(())
    }
}

fn build_shard(
    db_index: usize,
    db_count: usize,
    table_count: u64,
    master_source: &DataSource,
    slave_sources: &[DataSource],
    opts: &ClusterOptions,
) -> ShardGroup {
    let make_node = |source: &DataSource, role: NodeRole| {
        let node = PhysicalNode::new(
            source.for_db_index(db_count, db_index),
            role,
            db_index,
            table_count,
        );
        let node = match &opts.table_selector {
            Some(selector) => node.with_table_selector(Arc::clone(selector)),
            None => node,
        };
        Arc::new(node)
    };

    let master = make_node(master_source, NodeRole::Master);
    let slaves = slave_sources
        .iter()
        .map(|s| make_node(s, NodeRole::Slave))
        .collect();

    match &opts.balancer {
        Some(balancer) => ShardGroup::with_balancer(master, slaves, Arc::clone(balancer)),
        None => ShardGroup::new(master, slaves),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardConfig;
    use crate::node::DataSource;
    use crate::shard::tests::{node, RecordingConnector};

    fn shard(db_index: usize) -> Arc<ShardGroup> {
        Arc::new(ShardGroup::new(
            node(&format!("master{db_index}"), NodeRole::Master, db_index, 1),
            Vec::new(),
        ))
    }

    fn test_config(db_count: usize) -> ClusterConfig {
        ClusterConfig {
            db_count,
            table_count: 4,
            source: DataSource {
                username: "app".to_string(),
                host: "db-master".to_string(),
                database: "app".to_string(),
                ..DataSource::default()
            },
            slaves: vec![DataSource {
                username: "app".to_string(),
                host: "db-replica".to_string(),
                database: "app".to_string(),
                ..DataSource::default()
            }],
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn test_construction_rejects_count_mismatch() {
        let err = Cluster::new(3, 1, vec![shard(0), shard(1)]).unwrap_err();
        assert!(matches!(err, ClusterError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_route_picks_modulo_shard() {
        let cluster = Cluster::new(3, 1, vec![shard(0), shard(1), shard(2)]).unwrap();

        for key in [0i64, 1, 2, 3, 7, 100] {
            let bound = cluster.route(vec![KeyValue::Int(key)]).unwrap();
            let expected = (key % 3) as usize;
            assert_eq!(bound.master().db_index(), expected);
            assert_eq!(bound.key_values(), &[KeyValue::Int(key)]);
        }
    }

    #[test]
    fn test_single_database_needs_no_keys() {
        let cluster = Cluster::new(1, 1, vec![shard(0)]).unwrap();
        let bound = cluster.route(Vec::new()).unwrap();
        assert_eq!(bound.master().db_index(), 0);
    }

    #[test]
    fn test_out_of_range_selector_is_loud() {
        fn overrun(_: usize, _: &[KeyValue]) -> ClusterResult<usize> {
            Ok(99)
        }

        let cluster =
            Cluster::with_selector(2, 1, vec![shard(0), shard(1)], Arc::new(overrun)).unwrap();
        let err = cluster.route(vec![KeyValue::Int(1)]).unwrap_err();
        assert!(
            matches!(err, ClusterError::ShardIndexOutOfRange { index: 99, shard_count: 2 })
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_key_contract_violation_propagates() {
        let cluster = Cluster::new(2, 1, vec![shard(0), shard(1)]).unwrap();
        let err = cluster.route(vec![KeyValue::Text("not a key".into())]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
    }

    #[test]
    fn test_for_each_shard_order() {
        let cluster = Cluster::new(3, 1, vec![shard(0), shard(1), shard(2)]).unwrap();
        let mut indexes = Vec::new();
        cluster.for_each_shard(|s| indexes.push(s.master().db_index()));
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_expansion_without_overrides() {
        let cluster = Cluster::from_config(&test_config(4)).unwrap();

        assert_eq!(cluster.db_count(), 4);
        assert_eq!(cluster.shards().len(), 4);
        for (i, shard) in cluster.shards().iter().enumerate() {
            let master = shard.master();
            assert_eq!(master.db_index(), i);
            assert!(master.is_master());
            assert_eq!(master.table_count(), 4);
            assert_eq!(master.source().database, format!("app_{i:08}"));
            assert_eq!(shard.slaves().len(), 1);
            assert_eq!(shard.slaves()[0].source().host, "db-replica");
        }
    }

    #[test]
    fn test_expansion_defaults_counts_to_one() {
        let mut config = test_config(0);
        config.table_count = 0;
        config.slaves.clear();
        let cluster = Cluster::from_config(&config).unwrap();
        assert_eq!(cluster.db_count(), 1);
        assert_eq!(cluster.table_count(), 1);
        assert_eq!(cluster.shards().len(), 1);
        // unsuffixed database name for the single-database layout
        assert_eq!(cluster.shards()[0].master().source().database, "app");
    }

    #[test]
    fn test_expansion_with_overrides() {
        let mut config = test_config(2);
        config.slaves.clear();
        // listed out of order on purpose
        config.shards = vec![
            ShardConfig {
                db_index: 1,
                source: DataSource {
                    host: "host-b".to_string(),
                    database: "app".to_string(),
                    ..DataSource::default()
                },
                slaves: Vec::new(),
                table_count: Some(8),
            },
            ShardConfig {
                db_index: 0,
                source: DataSource {
                    host: "host-a".to_string(),
                    database: "app".to_string(),
                    ..DataSource::default()
                },
                slaves: Vec::new(),
                table_count: None,
            },
        ];

        let cluster = Cluster::from_config(&config).unwrap();
        assert_eq!(cluster.shards().len(), 2);
        assert_eq!(cluster.shards()[0].master().source().host, "host-a");
        assert_eq!(cluster.shards()[0].master().table_count(), 4);
        assert_eq!(cluster.shards()[1].master().source().host, "host-b");
        assert_eq!(cluster.shards()[1].master().table_count(), 8);
        assert_eq!(
            cluster.shards()[1].master().source().database,
            "app_00000001"
        );
    }

    #[test]
    fn test_expansion_rejects_gaps_and_duplicates() {
        let mut config = test_config(2);
        config.shards = vec![ShardConfig {
            db_index: 0,
            source: config.source.clone(),
            slaves: Vec::new(),
            table_count: None,
        }];
        // one override for two databases: a gap
        assert!(Cluster::from_config(&config).is_err());

        let mut config = test_config(2);
        let duplicate = ShardConfig {
            db_index: 1,
            source: config.source.clone(),
            slaves: Vec::new(),
            table_count: None,
        };
        config.shards = vec![duplicate.clone(), duplicate];
        assert!(Cluster::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_open_all_reaches_every_node() {
        let connector = RecordingConnector::default();
        let cluster = Cluster::from_config(&test_config(2)).unwrap();
        cluster.open_all(&connector).await.unwrap();

        // 2 shards x (1 master + 1 slave)
        assert_eq!(connector.conns.lock().unwrap().len(), 4);
        cluster.for_each_shard(|shard| {
            shard.for_each_node(|node| assert!(node.is_open()));
        });
    }

    #[tokio::test]
    async fn test_routed_writes_reach_the_right_master() {
        let connector = RecordingConnector::default();
        let cluster = Cluster::from_config(&test_config(2)).unwrap();
        cluster.open_all(&connector).await.unwrap();

        struct Order;
        impl crate::client::Model for Order {
            fn table_name(&self) -> &str {
                "orders"
            }
        }

        let bound = cluster.route(vec![KeyValue::Int(13)]).unwrap();
        bound.create(&Order).await.unwrap();

        // key 13 over 2 databases: shard 1, table 1*4 + 13%4 = 5
        let master = connector.conn_for("app_00000001");
        let ops = master.ops.lock().unwrap();
        assert_eq!(ops[0], ("create".to_string(), "orders_00000005".to_string()));
    }
}
