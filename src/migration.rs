//! Schema migration
//!
//! The cache owns its schema outright: tables and indexes are created on
//! `initialize()` if missing and never altered afterwards.

use crate::core::LedgerCache;
use crate::errors::LedgerCacheError;
use row_store::{DomainTable, RowStore};

impl LedgerCache {
    /// Create the entry table and the four domain tables
    pub(crate) async fn run_migrations(store: &dyn RowStore) -> Result<(), LedgerCacheError> {
        store.migrate().await?;

        let domain_tables: Vec<&str> = DomainTable::ALL
            .iter()
            .map(|table| table.table_name())
            .collect();
        tracing::info!(tables = ?domain_tables, "cache schema ready");
        Ok(())
    }
}
