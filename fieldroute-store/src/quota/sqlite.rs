//! SQLite-backed quota counters.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};

use fieldroute_core::{ProviderId, QuotaCounter, QuotaStore};

use crate::StoreError;
use crate::cache::lock_unpoisoned;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS provider_quota (
    provider       TEXT NOT NULL,
    date           TEXT NOT NULL,
    request_count  INTEGER NOT NULL DEFAULT 0,
    failure_count  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (provider, date)
)";

/// Durable daily counters that survive restarts.
///
/// Each increment is a single upsert statement, so concurrent recorders
/// never lose updates. Dates are stored as ISO-8601 text, which sorts
/// correctly and keeps range queries plain SQL. Increment failures are
/// logged rather than propagated so a broken counter database cannot take
/// down request handling.
pub struct SqliteQuotaStore {
    connection: Mutex<Connection>,
}

impl SqliteQuotaStore {
    /// Open (creating if needed) the quota database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Open an in-memory database, useful for tests and ephemeral runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|source| StoreError::Schema { source })?;
        connection
            .execute(SCHEMA, [])
            .map_err(|source| StoreError::Schema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn increment(&self, provider: ProviderId, date: NaiveDate, column: Column) {
        let statement = match column {
            Column::Requests => {
                "INSERT INTO provider_quota (provider, date, request_count, failure_count)
                 VALUES (?1, ?2, 1, 0)
                 ON CONFLICT(provider, date) DO UPDATE SET
                     request_count = request_count + 1"
            }
            Column::Failures => {
                "INSERT INTO provider_quota (provider, date, request_count, failure_count)
                 VALUES (?1, ?2, 0, 1)
                 ON CONFLICT(provider, date) DO UPDATE SET
                     failure_count = failure_count + 1"
            }
        };
        let connection = lock_unpoisoned(&self.connection);
        if let Err(err) = connection.execute(
            statement,
            params![provider.as_str(), date.format("%Y-%m-%d").to_string()],
        ) {
            warn!("quota increment failed for {provider} on {date}: {err}");
        }
    }

    /// Aggregate usage over the inclusive date range `[from, to]`.
    ///
    /// Useful for reporting against monthly billing quotas, which the
    /// per-day counters do not answer directly.
    #[must_use]
    pub fn usage_between(&self, provider: ProviderId, from: NaiveDate, to: NaiveDate) -> (u32, u32) {
        let connection = lock_unpoisoned(&self.connection);
        let totals = connection
            .query_row(
                "SELECT COALESCE(SUM(request_count), 0), COALESCE(SUM(failure_count), 0)
                 FROM provider_quota
                 WHERE provider = ?1 AND date BETWEEN ?2 AND ?3",
                params![
                    provider.as_str(),
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string(),
                ],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .unwrap_or_else(|err| {
                warn!("quota range query failed for {provider}: {err}");
                (0, 0)
            });
        (
            u32::try_from(totals.0).unwrap_or(u32::MAX),
            u32::try_from(totals.1).unwrap_or(u32::MAX),
        )
    }
}

enum Column {
    Requests,
    Failures,
}

impl QuotaStore for SqliteQuotaStore {
    fn record_success(&self, provider: ProviderId, date: NaiveDate) {
        self.increment(provider, date, Column::Requests);
    }

    fn record_failure(&self, provider: ProviderId, date: NaiveDate) {
        self.increment(provider, date, Column::Failures);
    }

    fn usage(&self, provider: ProviderId, date: NaiveDate) -> QuotaCounter {
        let connection = lock_unpoisoned(&self.connection);
        let row = connection
            .query_row(
                "SELECT request_count, failure_count
                 FROM provider_quota WHERE provider = ?1 AND date = ?2",
                params![provider.as_str(), date.format("%Y-%m-%d").to_string()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional();
        let (request_count, failure_count) = match row {
            Ok(Some((requests, failures))) => (
                u32::try_from(requests).unwrap_or(u32::MAX),
                u32::try_from(failures).unwrap_or(u32::MAX),
            ),
            Ok(None) => (0, 0),
            Err(err) => {
                warn!("quota read failed for {provider} on {date}: {err}");
                (0, 0)
            }
        };
        QuotaCounter {
            provider,
            date,
            request_count,
            failure_count,
        }
    }
}
