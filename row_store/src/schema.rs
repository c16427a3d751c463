//! Table layout and the fixed SQL fragments that may be spliced into statements
//!
//! Only the values defined in this module are ever formatted into SQL text.
//! Caller-supplied data is always bound as a parameter.

/// Structured tables living next to `cache_entries`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainTable {
    Transactions,
    Blocks,
    Accounts,
    Tokens,
}

impl DomainTable {
    pub const ALL: [DomainTable; 4] = [
        DomainTable::Transactions,
        DomainTable::Blocks,
        DomainTable::Accounts,
        DomainTable::Tokens,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            DomainTable::Transactions => "cached_transactions",
            DomainTable::Blocks => "cached_blocks",
            DomainTable::Accounts => "cached_accounts",
            DomainTable::Tokens => "cached_tokens",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            DomainTable::Transactions => "signature",
            DomainTable::Blocks => "slot",
            DomainTable::Accounts => "address",
            DomainTable::Tokens => "mint",
        }
    }
}

/// Primary key of a structured row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKey<'a> {
    Text(&'a str),
    Slot(i64),
}

/// Victim ordering for pressure-driven eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimOrder {
    LeastRecentlyUsed,
    LeastFrequentlyUsed,
    /// Rows already past expiry first, then oldest `created_at`
    ExpiredThenOldest,
}

pub(crate) const CREATE_CACHE_ENTRIES: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY NOT NULL,
    payload BLOB NOT NULL,
    compressed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    last_accessed INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 0
)";

pub(crate) const CREATE_TRANSACTIONS: &str = "CREATE TABLE IF NOT EXISTS cached_transactions (
    signature TEXT PRIMARY KEY NOT NULL,
    slot INTEGER NOT NULL,
    block_time INTEGER,
    fee INTEGER NOT NULL,
    success INTEGER NOT NULL,
    data TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
)";

pub(crate) const CREATE_BLOCKS: &str = "CREATE TABLE IF NOT EXISTS cached_blocks (
    slot INTEGER PRIMARY KEY NOT NULL,
    blockhash TEXT NOT NULL,
    parent_slot INTEGER NOT NULL,
    block_time INTEGER,
    transaction_count INTEGER NOT NULL,
    data TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
)";

pub(crate) const CREATE_ACCOUNTS: &str = "CREATE TABLE IF NOT EXISTS cached_accounts (
    address TEXT PRIMARY KEY NOT NULL,
    lamports INTEGER NOT NULL,
    owner TEXT NOT NULL,
    executable INTEGER NOT NULL,
    data TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
)";

pub(crate) const CREATE_TOKENS: &str = "CREATE TABLE IF NOT EXISTS cached_tokens (
    mint TEXT PRIMARY KEY NOT NULL,
    symbol TEXT,
    name TEXT,
    decimals INTEGER NOT NULL,
    supply TEXT,
    data TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
)";

pub(crate) const CREATE_INDEXES: [&str; 5] = [
    "CREATE INDEX IF NOT EXISTS idx_cache_entries_last_accessed ON cache_entries(last_accessed)",
    "CREATE INDEX IF NOT EXISTS idx_cache_entries_created_at ON cache_entries(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_cache_entries_hit_count ON cache_entries(hit_count, last_accessed)",
    "CREATE INDEX IF NOT EXISTS idx_cached_transactions_slot ON cached_transactions(slot)",
    "CREATE INDEX IF NOT EXISTS idx_cached_tokens_symbol ON cached_tokens(symbol)",
];

/// Every statement `migrate` runs, in order
pub(crate) fn migration_statements() -> impl Iterator<Item = &'static str> {
    [
        CREATE_CACHE_ENTRIES,
        CREATE_TRANSACTIONS,
        CREATE_BLOCKS,
        CREATE_ACCOUNTS,
        CREATE_TOKENS,
    ]
    .into_iter()
    .chain(CREATE_INDEXES)
}

pub(crate) fn victim_query(order: VictimOrder) -> &'static str {
    match order {
        VictimOrder::LeastRecentlyUsed => {
            "SELECT key FROM cache_entries ORDER BY last_accessed ASC, created_at ASC LIMIT ?"
        }
        VictimOrder::LeastFrequentlyUsed => {
            "SELECT key FROM cache_entries ORDER BY hit_count ASC, last_accessed ASC LIMIT ?"
        }
        VictimOrder::ExpiredThenOldest => {
            "SELECT key FROM cache_entries \
             ORDER BY CASE WHEN created_at + ttl_ms < ? THEN 0 ELSE 1 END ASC, created_at ASC \
             LIMIT ?"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_tables_are_distinct() {
        let names: std::collections::HashSet<_> =
            DomainTable::ALL.iter().map(|t| t.table_name()).collect();
        assert_eq!(names.len(), 4);
        assert!(!names.contains("cache_entries"));
    }

    #[test]
    fn test_migration_covers_every_table() {
        let statements: Vec<_> = migration_statements().collect();
        assert!(statements.iter().any(|s| s.contains("cache_entries (")));
        for table in DomainTable::ALL {
            let needle = format!("{} (", table.table_name());
            assert!(statements.iter().any(|s| s.contains(&needle)), "{}", needle);
        }
    }
}
