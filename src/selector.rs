/// Shard and table selection algorithms.
///
/// Both selector traits are pluggable so alternative strategies (consistent
/// hashing, range maps, lookup tables) can be substituted without touching
/// the cluster or shard logic. Plain functions and closures satisfy the
/// traits through the blanket impls below.
use crate::error::{ClusterError, ClusterResult};
use crate::key::KeyValue;

/// Maps sharding key values to a database index in `[0, cardinality)`.
pub trait DbSelector: Send + Sync {
    fn select(&self, cardinality: usize, values: &[KeyValue]) -> ClusterResult<usize>;
}

/// Maps a logical table name to the physical table name for one shard.
pub trait TableSelector: Send + Sync {
    fn resolve(
        &self,
        base: &str,
        table_count: u64,
        db_index: usize,
        values: &[KeyValue],
    ) -> ClusterResult<String>;
}

impl<F> DbSelector for F
where
    F: Fn(usize, &[KeyValue]) -> ClusterResult<usize> + Send + Sync,
{
    fn select(&self, cardinality: usize, values: &[KeyValue]) -> ClusterResult<usize> {
        self(cardinality, values)
    }
}

impl<F> TableSelector for F
where
    F: Fn(&str, u64, usize, &[KeyValue]) -> ClusterResult<String> + Send + Sync,
{
    fn resolve(
        &self,
        base: &str,
        table_count: u64,
        db_index: usize,
        values: &[KeyValue],
    ) -> ClusterResult<String> {
        self(base, table_count, db_index, values)
    }
}

/// The single integer every default selector requires. Zero values, extra
/// values, and non-integer types are contract violations, never coerced.
fn single_integer(values: &[KeyValue]) -> ClusterResult<u64> {
    let value = match values {
        [v] => v,
        _ => {
            return Err(ClusterError::key_contract(format!(
                "default selectors require exactly one key value, got {}",
                values.len()
            )))
        }
    };

    value.as_routing_int().ok_or_else(|| {
        ClusterError::key_contract(format!(
            "default selectors require an integer key value, got {}",
            value.type_name()
        ))
    })
}

/// Default database selector: `value mod cardinality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuloSelector;

impl DbSelector for ModuloSelector {
    fn select(&self, cardinality: usize, values: &[KeyValue]) -> ClusterResult<usize> {
        // Unsharded deployments omit key values entirely, so the single
        // database case never inspects them.
        if cardinality <= 1 {
            return Ok(0);
        }

        let value = single_integer(values)?;
        Ok((value % cardinality as u64) as usize)
    }
}

/// Default table selector: appends a zero-padded decimal suffix that is
/// unique across the whole cluster, not just within one database:
/// `db_index * table_count + value mod table_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixSelector;

impl TableSelector for SuffixSelector {
    fn resolve(
        &self,
        base: &str,
        table_count: u64,
        db_index: usize,
        values: &[KeyValue],
    ) -> ClusterResult<String> {
        if table_count <= 1 {
            return Ok(base.to_string());
        }

        let value = single_integer(values)?;
        let suffix = db_index as u64 * table_count + value % table_count;
        Ok(format!("{base}_{suffix:08}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_database_ignores_values() {
        let selector = ModuloSelector;
        assert_eq!(selector.select(1, &[]).unwrap(), 0);
        assert_eq!(selector.select(1, &[KeyValue::Int(99)]).unwrap(), 0);
        // even values the sharded path would reject
        assert_eq!(
            selector
                .select(1, &[KeyValue::Text("x".into()), KeyValue::Null])
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_modulo_selection_is_stable() {
        let selector = ModuloSelector;
        for value in [0i64, 1, 7, 13, 1_000_003] {
            let first = selector.select(4, &[KeyValue::Int(value)]).unwrap();
            assert_eq!(first, (value % 4) as usize);
            for _ in 0..10 {
                assert_eq!(selector.select(4, &[KeyValue::Int(value)]).unwrap(), first);
            }
        }
        assert_eq!(selector.select(4, &[KeyValue::Uint(6)]).unwrap(), 2);
    }

    #[test]
    fn test_modulo_rejects_wrong_arity() {
        let selector = ModuloSelector;
        let err = selector.select(4, &[]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
        assert!(err.is_fatal());

        let err = selector
            .select(4, &[KeyValue::Int(1), KeyValue::Int(2)])
            .unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
    }

    #[test]
    fn test_modulo_rejects_non_integer() {
        let selector = ModuloSelector;
        let err = selector.select(4, &[KeyValue::Text("13".into())]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));

        let err = selector.select(4, &[KeyValue::Float(13.0)]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
    }

    #[test]
    fn test_suffix_single_table_is_untouched() {
        let selector = SuffixSelector;
        assert_eq!(selector.resolve("orders", 1, 5, &[]).unwrap(), "orders");
    }

    #[test]
    fn test_suffix_is_globally_unique() {
        let selector = SuffixSelector;
        // db 2, 4 tables per db, key 13: 2*4 + 13%4 = 9
        assert_eq!(
            selector.resolve("orders", 4, 2, &[KeyValue::Int(13)]).unwrap(),
            "orders_00000009"
        );
        assert_eq!(
            selector.resolve("orders", 4, 0, &[KeyValue::Int(13)]).unwrap(),
            "orders_00000001"
        );
        assert_eq!(
            selector.resolve("orders", 4, 3, &[KeyValue::Int(0)]).unwrap(),
            "orders_00000012"
        );
    }

    #[test]
    fn test_suffix_zero_padding() {
        let selector = SuffixSelector;
        let name = selector.resolve("t", 2, 0, &[KeyValue::Int(1)]).unwrap();
        assert_eq!(name, "t_00000001");
        assert_eq!(name.len(), "t_".len() + 8);
    }

    #[test]
    fn test_suffix_rejects_bad_keys() {
        let selector = SuffixSelector;
        let err = selector.resolve("orders", 4, 0, &[]).unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));

        let err = selector
            .resolve("orders", 4, 0, &[KeyValue::Bool(true)])
            .unwrap_err();
        assert!(matches!(err, ClusterError::KeyContract { .. }));
    }

    #[test]
    fn test_function_selectors() {
        fn pick_last_digit(cardinality: usize, values: &[KeyValue]) -> ClusterResult<usize> {
            let v = values[0].as_routing_int().unwrap_or(0);
            Ok((v % 10) as usize % cardinality)
        }

        let selector: &dyn DbSelector = &pick_last_digit;
        assert_eq!(selector.select(4, &[KeyValue::Int(17)]).unwrap(), 3);

        fn fixed_table(
            base: &str,
            _count: u64,
            _index: usize,
            _values: &[KeyValue],
        ) -> ClusterResult<String> {
            Ok(format!("{base}_hot"))
        }

        let table: &dyn TableSelector = &fixed_table;
        assert_eq!(
            table.resolve("orders", 8, 1, &[KeyValue::Int(3)]).unwrap(),
            "orders_hot"
        );
    }
}
