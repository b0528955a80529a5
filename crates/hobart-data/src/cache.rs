//! Write-once cache for the bureau-balance table.
//!
//! The bureau-balance table is by far the largest source and is consumed
//! only by the bureau deriver, which may run several times per process
//! (one invocation per case bucket). The cache is owned by the ingestion
//! layer and passed to the deriver as an explicit argument; it is never
//! ambient process state.

use crate::error::{DataError, Result};
use polars::prelude::*;

/// Write-once, read-many cache for the raw bureau-balance table.
///
/// Writes only happen at load time; a changed source file requires an
/// explicit [`reset`](Self::reset) before reloading. No interior locking
/// is needed because the pipeline is single-threaded batch.
#[derive(Debug, Default)]
pub struct BureauBalanceCache {
    table: Option<DataFrame>,
}

impl BureauBalanceCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self { table: None }
    }

    /// Store the loaded table. Fails if the cache is already populated;
    /// call [`reset`](Self::reset) first when source data changes.
    pub fn set(&mut self, table: DataFrame) -> Result<()> {
        if self.table.is_some() {
            return Err(DataError::Cache(
                "bureau-balance cache already populated; reset() before reloading".to_string(),
            ));
        }
        log::debug!("caching bureau-balance table: {} rows", table.height());
        self.table = Some(table);
        Ok(())
    }

    /// The cached table, if loaded.
    pub const fn get(&self) -> Option<&DataFrame> {
        self.table.as_ref()
    }

    /// Load via `loader` on first use, then serve the cached table.
    pub fn get_or_load<F>(&mut self, loader: F) -> Result<&DataFrame>
    where
        F: FnOnce() -> Result<DataFrame>,
    {
        if self.table.is_none() {
            self.set(loader()?)?;
        }
        self.table
            .as_ref()
            .ok_or_else(|| DataError::Cache("bureau-balance cache empty after load".to_string()))
    }

    /// Invalidate the cache. The next access reloads.
    pub fn reset(&mut self) {
        self.table = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances() -> DataFrame {
        df!(
            "sk_id_bureau" => [1i64, 1, 2],
            "months_balance" => [-2i32, -1, -1],
            "status" => ["0", "1", "C"],
        )
        .unwrap()
    }

    #[test]
    fn set_is_write_once() {
        let mut cache = BureauBalanceCache::new();
        cache.set(balances()).unwrap();
        let err = cache.set(balances()).unwrap_err();
        assert!(matches!(err, DataError::Cache(_)));
    }

    #[test]
    fn reset_allows_reload() {
        let mut cache = BureauBalanceCache::new();
        cache.set(balances()).unwrap();
        cache.reset();
        assert!(cache.get().is_none());
        cache.set(balances()).unwrap();
        assert_eq!(cache.get().unwrap().height(), 3);
    }

    #[test]
    fn get_or_load_loads_exactly_once() {
        let mut cache = BureauBalanceCache::new();
        let mut calls = 0;
        let df = cache
            .get_or_load(|| {
                calls += 1;
                Ok(balances())
            })
            .unwrap();
        assert_eq!(df.height(), 3);

        let df = cache.get_or_load(|| unreachable!()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(calls, 1);
    }
}
