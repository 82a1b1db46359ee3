/// One database shard: a master, its read replicas, and the balancer that
/// spreads reads across them.
use crate::balance::{Balancer, RoundRobin};
use crate::client::{ClientConn, Connector, Model, Rows};
use crate::error::{ClusterError, ClusterResult};
use crate::key::KeyValue;
use crate::node::PhysicalNode;
use std::sync::Arc;

pub struct ShardGroup {
    master: Arc<PhysicalNode>,
    slaves: Vec<Arc<PhysicalNode>>,
    balancer: Arc<dyn Balancer>,
}

impl ShardGroup {
    /// Build a shard with the default round-robin balancer. With no slaves
    /// configured, read traffic falls back to the master.
    pub fn new(master: Arc<PhysicalNode>, slaves: Vec<Arc<PhysicalNode>>) -> Self {
        Self::with_balancer(master, slaves, Arc::new(RoundRobin::new()))
    }

    pub fn with_balancer(
        master: Arc<PhysicalNode>,
        mut slaves: Vec<Arc<PhysicalNode>>,
        balancer: Arc<dyn Balancer>,
    ) -> Self {
        if slaves.is_empty() {
            slaves.push(Arc::clone(&master));
        }
        Self {
            master,
            slaves,
            balancer,
        }
    }

    pub fn master(&self) -> &Arc<PhysicalNode> {
        &self.master
    }

    pub fn slaves(&self) -> &[Arc<PhysicalNode>] {
        &self.slaves
    }

    /// Bind the sharding key values of one logical request. Binding is
    /// cheap (shared nodes and balancer, owned values) and never touches
    /// the group, so concurrent requests against the same shard stay
    /// independent.
    pub fn bind(&self, values: Vec<KeyValue>) -> BoundShard {
        BoundShard {
            master: Arc::clone(&self.master),
            slaves: self.slaves.clone(),
            balancer: Arc::clone(&self.balancer),
            values,
        }
    }

    /// Open the master and every slave; the first failure wins and leaves
    /// the remaining nodes untouched.
    pub async fn open(&self, connector: &dyn Connector) -> ClusterResult<()> {
        self.master.open(connector).await?;
        for slave in &self.slaves {
            slave.open(connector).await?;
        }
        Ok(())
    }

    /// Visit the master and then each slave in configured order.
    pub fn for_each_node(&self, mut f: impl FnMut(&Arc<PhysicalNode>)) {
        f(&self.master);
        for slave in &self.slaves {
            f(slave);
        }
    }
}

/// A shard handle carrying the sharding key values of one logical request.
///
/// Writes always target the master. Reads go through the balancer, so two
/// reads of the same handle may land on different replicas; there is no
/// read-your-writes guarantee across calls. That is a deliberate trade of
/// consistency for simplicity, matching the replica topology's nature.
pub struct BoundShard {
    master: Arc<PhysicalNode>,
    slaves: Vec<Arc<PhysicalNode>>,
    balancer: Arc<dyn Balancer>,
    values: Vec<KeyValue>,
}

impl std::fmt::Debug for BoundShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundShard")
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl BoundShard {
    pub fn key_values(&self) -> &[KeyValue] {
        &self.values
    }

    pub fn master(&self) -> &Arc<PhysicalNode> {
        &self.master
    }

    pub fn slaves(&self) -> &[Arc<PhysicalNode>] {
        &self.slaves
    }

    /// Physical table name this request resolves `base` to. Also useful as
    /// a dry run of the routing math without touching any connection.
    pub fn table_name(&self, base: &str) -> ClusterResult<String> {
        self.master.resolve_table(base, &self.values)
    }

    fn read_node(&self) -> ClusterResult<&Arc<PhysicalNode>> {
        let idx = self
            .balancer
            .next(&self.slaves)
            .ok_or(ClusterError::NoReplica)?;
        self.slaves.get(idx).ok_or(ClusterError::NoReplica)
    }

    // Write class: always the master.

    pub async fn create(&self, model: &dyn Model) -> ClusterResult<u64> {
        let node = &self.master;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::debug!("create on {} table {}", node.label(), table);
        node.conn()?
            .create(&table, model)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn save(&self, model: &dyn Model) -> ClusterResult<u64> {
        let node = &self.master;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::debug!("save on {} table {}", node.label(), table);
        node.conn()?
            .save(&table, model)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn delete(&self, model: &dyn Model) -> ClusterResult<u64> {
        let node = &self.master;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::debug!("delete on {} table {}", node.label(), table);
        node.conn()?
            .delete(&table, model)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn updates(&self, model: &dyn Model) -> ClusterResult<u64> {
        let node = &self.master;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::debug!("updates on {} table {}", node.label(), table);
        node.conn()?
            .updates(&table, model)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn update_columns(&self, model: &dyn Model, columns: &[String]) -> ClusterResult<u64> {
        let node = &self.master;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::debug!("update_columns on {} table {}", node.label(), table);
        node.conn()?
            .update_columns(&table, model, columns)
            .await
            .map_err(ClusterError::Client)
    }

    /// Raw exec routes to the master: it may affect schema or data.
    pub async fn exec(&self, sql: &str, params: &[KeyValue]) -> ClusterResult<u64> {
        let node = &self.master;
        log::debug!("exec on {}", node.label());
        node.conn()?
            .exec(sql, params)
            .await
            .map_err(ClusterError::Client)
    }

    /// Begin a transaction on the master. Transactions are confined to the
    /// single master connection; there is no cross-shard coordination.
    pub async fn begin(&self) -> ClusterResult<()> {
        self.master
            .conn()?
            .begin()
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn commit(&self) -> ClusterResult<()> {
        self.master
            .conn()?
            .commit()
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn rollback(&self) -> ClusterResult<()> {
        self.master
            .conn()?
            .rollback()
            .await
            .map_err(ClusterError::Client)
    }

    // Read class: a balanced replica per call.

    pub async fn find(&self, out: &mut dyn Model) -> ClusterResult<u64> {
        let node = self.read_node()?;
        let table = node.resolve_table(out.table_name(), &self.values)?;
        log::trace!("find on {} table {}", node.label(), table);
        node.conn()?
            .find(&table, out)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn first(&self, out: &mut dyn Model) -> ClusterResult<()> {
        let node = self.read_node()?;
        let table = node.resolve_table(out.table_name(), &self.values)?;
        log::trace!("first on {} table {}", node.label(), table);
        node.conn()?
            .first(&table, out)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn last(&self, out: &mut dyn Model) -> ClusterResult<()> {
        let node = self.read_node()?;
        let table = node.resolve_table(out.table_name(), &self.values)?;
        log::trace!("last on {} table {}", node.label(), table);
        node.conn()?
            .last(&table, out)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn scan(&self, out: &mut dyn Model) -> ClusterResult<()> {
        let node = self.read_node()?;
        let table = node.resolve_table(out.table_name(), &self.values)?;
        log::trace!("scan on {} table {}", node.label(), table);
        node.conn()?
            .scan(&table, out)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn count(&self, model: &dyn Model) -> ClusterResult<u64> {
        let node = self.read_node()?;
        let table = node.resolve_table(model.table_name(), &self.values)?;
        log::trace!("count on {} table {}", node.label(), table);
        node.conn()?
            .count(&table)
            .await
            .map_err(ClusterError::Client)
    }

    pub async fn query(&self, sql: &str, params: &[KeyValue]) -> ClusterResult<Rows> {
        let node = self.read_node()?;
        log::trace!("query on {}", node.label());
        node.conn()?
            .query(sql, params)
            .await
            .map_err(ClusterError::Client)
    }
}
