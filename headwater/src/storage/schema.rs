use error_stack::{Result, ResultExt};
use sqlx::PgPool;

use super::store::StoreError;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS block_headers (
    id          BIGSERIAL PRIMARY KEY,
    chain_id    INTEGER NOT NULL,
    number      BIGINT NOT NULL,
    hash        TEXT NOT NULL,
    parent_hash TEXT NOT NULL,
    "timestamp" BIGINT NOT NULL
)
"#;

// The two unique indexes back the upsert's conflict handling; the lookup
// index on (chain_id, number) is the unique one.
const CREATE_INDEXES: &[&str] = &[
    r#"CREATE UNIQUE INDEX IF NOT EXISTS block_headers_chain_id_number_key
       ON block_headers (chain_id, number)"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS block_headers_chain_id_hash_key
       ON block_headers (chain_id, hash)"#,
    r#"CREATE INDEX IF NOT EXISTS block_headers_chain_id_timestamp_idx
       ON block_headers (chain_id, "timestamp")"#,
];

/// Create the block header table and its indexes if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_TABLE)
        .execute(pool)
        .await
        .change_context(StoreError::Unavailable)
        .attach_printable("failed to create the block_headers table")?;

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .change_context(StoreError::Unavailable)
            .attach_printable("failed to create a block_headers index")?;
    }

    Ok(())
}
