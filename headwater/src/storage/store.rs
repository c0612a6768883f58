use std::time::Instant;

use error_stack::{Result, ResultExt};
use headwater_observability::metrics::DatabaseMetrics;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::core::{BlockHeader, ChainId, NewBlockHeader};

const MODEL: &str = "block_header";

// Postgres class 23 = integrity constraint violation; 23505 is the unique
// violation the upsert silences.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug)]
pub enum StoreError {
    Unavailable,
    ConstraintViolation,
}

/// Chain-scoped block header repository.
///
/// Headers are immutable once written: the only mutation is insert-if-absent
/// over the `(chain_id, number)` and `(chain_id, hash)` uniqueness
/// constraints. Reads always filter by chain.
#[derive(Clone)]
pub struct BlockStore {
    pool: PgPool,
    metrics: DatabaseMetrics,
}

impl BlockStore {
    pub fn new(pool: PgPool, metrics: DatabaseMetrics) -> Self {
        Self { pool, metrics }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The stored header with the highest number for the chain.
    pub async fn latest(&self, chain_id: ChainId) -> Result<Option<BlockHeader>, StoreError> {
        let started = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT id, chain_id, number, hash, parent_hash, "timestamp"
            FROM block_headers
            WHERE chain_id = $1
            ORDER BY number DESC
            LIMIT 1
            "#,
        )
        .bind(chain_id as i32)
        .fetch_optional(&self.pool)
        .await;
        self.metrics
            .record_query(MODEL, "latest", row.is_ok(), started.elapsed());

        let row = row
            .map_err(into_store_error)
            .attach_printable("failed to query the latest block header")
            .attach_printable_lazy(|| format!("chain id: {chain_id}"))?;

        row.as_ref().map(header_from_row).transpose()
    }

    /// The stored header at the given height for the chain.
    pub async fn by_number(
        &self,
        chain_id: ChainId,
        number: u64,
    ) -> Result<Option<BlockHeader>, StoreError> {
        let started = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT id, chain_id, number, hash, parent_hash, "timestamp"
            FROM block_headers
            WHERE chain_id = $1 AND number = $2
            "#,
        )
        .bind(chain_id as i32)
        .bind(number as i64)
        .fetch_optional(&self.pool)
        .await;
        self.metrics
            .record_query(MODEL, "by_number", row.is_ok(), started.elapsed());

        let row = row
            .map_err(into_store_error)
            .attach_printable("failed to query a block header by number")
            .attach_printable_lazy(|| format!("chain id: {chain_id}, number: {number}"))?;

        row.as_ref().map(header_from_row).transpose()
    }

    /// Insert a batch of headers, skipping rows that collide with an existing
    /// `(chain_id, number)` or `(chain_id, hash)`.
    ///
    /// The batch is a single statement: either every non-duplicate row is
    /// committed or none is. Returns the number of rows actually inserted.
    pub async fn insert_many(&self, headers: &[NewBlockHeader]) -> Result<u64, StoreError> {
        if headers.is_empty() {
            return Ok(0);
        }

        let mut chain_ids = Vec::with_capacity(headers.len());
        let mut numbers = Vec::with_capacity(headers.len());
        let mut hashes = Vec::with_capacity(headers.len());
        let mut parent_hashes = Vec::with_capacity(headers.len());
        let mut timestamps = Vec::with_capacity(headers.len());

        for header in headers {
            chain_ids.push(header.chain_id as i32);
            numbers.push(header.number as i64);
            hashes.push(header.hash.clone());
            parent_hashes.push(header.parent_hash.clone());
            timestamps.push(i64::from(header.timestamp));
        }

        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO block_headers (chain_id, number, hash, parent_hash, "timestamp")
            SELECT * FROM UNNEST($1::int4[], $2::int8[], $3::text[], $4::text[], $5::int8[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(chain_ids)
        .bind(numbers)
        .bind(hashes)
        .bind(parent_hashes)
        .bind(timestamps)
        .execute(&self.pool)
        .await;
        self.metrics
            .record_query(MODEL, "insert_many", result.is_ok(), started.elapsed());

        let result = result
            .map_err(into_store_error)
            .attach_printable("failed to insert block headers")
            .attach_printable_lazy(|| format!("batch size: {}", headers.len()))?;

        Ok(result.rows_affected())
    }

    /// Heights missing strictly inside the chain's stored `[min, max]` range,
    /// ascending, at most `limit` of them.
    ///
    /// The scan is a single statement over the ordered stored heights, so
    /// concurrent inserts cannot make one call report a height twice. An
    /// empty chain has no range and yields nothing.
    pub async fn find_missing_in_range(
        &self,
        chain_id: ChainId,
        limit: usize,
    ) -> Result<Vec<u64>, StoreError> {
        let started = Instant::now();
        let rows = sqlx::query(
            r#"
            WITH ordered AS (
                SELECT number, LEAD(number) OVER (ORDER BY number) AS next
                FROM block_headers
                WHERE chain_id = $1
            )
            SELECT missing.number AS number
            FROM ordered
            CROSS JOIN LATERAL
                generate_series(ordered.number + 1, ordered.next - 1) AS missing(number)
            WHERE ordered.next IS NOT NULL AND ordered.next > ordered.number + 1
            ORDER BY missing.number
            LIMIT $2
            "#,
        )
        .bind(chain_id as i32)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        self.metrics
            .record_query(MODEL, "find_missing_in_range", rows.is_ok(), started.elapsed());

        let rows = rows
            .map_err(into_store_error)
            .attach_printable("failed to scan for missing block heights")
            .attach_printable_lazy(|| format!("chain id: {chain_id}"))?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("number")
                    .map(|number| number as u64)
                    .map_err(into_store_error)
            })
            .collect()
    }

    /// Cheap connectivity check used by the readiness probe.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        self.metrics
            .record_query(MODEL, "ping", result.is_ok(), started.elapsed());

        result
            .map(|_| ())
            .map_err(into_store_error)
            .attach_printable("database ping failed")
    }
}

fn header_from_row(row: &PgRow) -> Result<BlockHeader, StoreError> {
    let read = || -> std::result::Result<BlockHeader, sqlx::Error> {
        Ok(BlockHeader {
            id: row.try_get::<i64, _>("id")?,
            chain_id: row.try_get::<i32, _>("chain_id")? as ChainId,
            number: row.try_get::<i64, _>("number")? as u64,
            hash: row.try_get("hash")?,
            parent_hash: row.try_get("parent_hash")?,
            timestamp: row.try_get::<i64, _>("timestamp")? as u32,
        })
    };

    read()
        .map_err(into_store_error)
        .attach_printable("failed to decode a block header row")
}

fn into_store_error(err: sqlx::Error) -> error_stack::Report<StoreError> {
    let kind = match &err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) if code.starts_with("23") && code != UNIQUE_VIOLATION => {
                StoreError::ConstraintViolation
            }
            _ => StoreError::Unavailable,
        },
        _ => StoreError::Unavailable,
    };
    error_stack::Report::from(err).change_context(kind)
}

impl error_stack::Context for StoreError {}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable => write!(f, "block store unavailable"),
            StoreError::ConstraintViolation => write!(f, "block store constraint violation"),
        }
    }
}
