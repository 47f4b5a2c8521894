//! SQLite-backed durable cache tier.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};

use fieldroute_core::{
    CacheEntry, Coordinate, DistanceCache, DistanceOptions, DistanceResult, VolatilityClass,
    cache_key,
};

use super::{CacheTtls, lock_unpoisoned};
use crate::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS distance_cache (
    key         TEXT PRIMARY KEY,
    payload     TEXT NOT NULL,
    created_at  INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL,
    volatility  TEXT NOT NULL
)";

/// Durable cache tier that survives restarts.
///
/// Payloads are stored as JSON; expiry timestamps as Unix seconds so the
/// expiry predicate runs in SQL. Read or write failures degrade to cache
/// misses with a warning, never to request failures.
pub struct SqliteDistanceCache {
    connection: Mutex<Connection>,
    ttls: CacheTtls,
}

impl SqliteDistanceCache {
    /// Open (creating if needed) the cache database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, ttls: CacheTtls) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection, ttls)
    }

    /// Open an in-memory database, useful for tests and ephemeral runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the schema cannot be created.
    pub fn open_in_memory(ttls: CacheTtls) -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        Self::from_connection(connection, ttls)
    }

    fn from_connection(connection: Connection, ttls: CacheTtls) -> Result<Self, StoreError> {
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|source| StoreError::Schema { source })?;
        connection
            .execute(SCHEMA, [])
            .map_err(|source| StoreError::Schema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
            ttls,
        })
    }

    /// The TTL settings this tier stamps onto fresh entries.
    pub(crate) const fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    /// Delete every expired row; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let connection = lock_unpoisoned(&self.connection);
        match connection.execute(
            "DELETE FROM distance_cache WHERE expires_at <= ?1",
            params![Utc::now().timestamp()],
        ) {
            Ok(removed) => removed,
            Err(err) => {
                warn!("cache purge failed: {err}");
                0
            }
        }
    }

    /// Total rows currently stored, expired or not.
    pub fn len(&self) -> usize {
        let connection = lock_unpoisoned(&self.connection);
        connection
            .query_row("SELECT COUNT(*) FROM distance_cache", [], |row| {
                row.get::<_, i64>(0)
            })
            .ok()
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(0)
    }

    /// Whether the tier holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get_entry(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let connection = lock_unpoisoned(&self.connection);
        let row = connection
            .query_row(
                "SELECT payload, created_at, expires_at, volatility
                 FROM distance_cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional();

        let (payload, created_at, expires_at, volatility) = match row {
            Ok(Some(columns)) => columns,
            Ok(None) => return None,
            Err(err) => {
                warn!("cache read failed for {key}: {err}");
                return None;
            }
        };

        if expires_at <= now.timestamp() {
            if let Err(err) =
                connection.execute("DELETE FROM distance_cache WHERE key = ?1", params![key])
            {
                warn!("failed to drop expired cache row {key}: {err}");
            }
            return None;
        }

        let payload: DistanceResult = match serde_json::from_str(&payload) {
            Ok(value) => value,
            Err(err) => {
                warn!("cache payload for {key} is corrupt: {err}");
                return None;
            }
        };
        Some(CacheEntry {
            payload,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or(now),
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or(now),
            volatility: VolatilityClass::parse(&volatility).unwrap_or(VolatilityClass::Static),
        })
    }

    pub(crate) fn insert_entry(&self, key: &str, entry: &CacheEntry) {
        let payload = match serde_json::to_string(&entry.payload) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialise cache payload for {key}: {err}");
                return;
            }
        };
        let connection = lock_unpoisoned(&self.connection);
        let written = connection.execute(
            "INSERT INTO distance_cache (key, payload, created_at, expires_at, volatility)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                 payload = excluded.payload,
                 created_at = excluded.created_at,
                 expires_at = excluded.expires_at,
                 volatility = excluded.volatility",
            params![
                key,
                payload,
                entry.created_at.timestamp(),
                entry.expires_at.timestamp(),
                entry.volatility.as_str(),
            ],
        );
        if let Err(err) = written {
            warn!("cache write failed for {key}: {err}");
        }
    }
}

impl DistanceCache for SqliteDistanceCache {
    fn get(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Option<DistanceResult> {
        let key = cache_key(origin, destination, options);
        self.get_entry(&key, Utc::now()).map(|entry| entry.payload)
    }

    fn put(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
        result: &DistanceResult,
        volatility: VolatilityClass,
    ) {
        let key = cache_key(origin, destination, options);
        let entry = self.ttls.entry(result, volatility, Utc::now());
        self.insert_entry(&key, &entry);
    }
}
