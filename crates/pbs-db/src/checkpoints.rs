use crate::Store;
use pbs_errors::PbsError;
use pbs_primitives::Checkpoint;
use sqlx::{Postgres, Transaction};

impl Store {
    /// Inserts a checkpoint row if one does not already exist for this
    /// stream. Conflict-free by design — a stream that is already tracked
    /// is left untouched, never reset.
    pub async fn ensure_checkpoint(&self, stream_key: &str) -> Result<Checkpoint, PbsError> {
        sqlx::query("INSERT INTO checkpoints (stream_key) VALUES ($1) ON CONFLICT (stream_key) DO NOTHING")
            .bind(stream_key)
            .execute(self.pool())
            .await?;
        self.get_checkpoint(stream_key).await?.ok_or_else(|| {
            PbsError::FatalRun(format!("checkpoint {stream_key} vanished immediately after ensure"))
        })
    }

    pub async fn get_checkpoint(&self, stream_key: &str) -> Result<Option<Checkpoint>, PbsError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            "SELECT stream_key, cursor, last_processed_marker, completed FROM checkpoints WHERE stream_key = $1",
        )
        .bind(stream_key)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Into::into))
    }

    /// Advances `last_processed_marker` to `max(current, marker)` and
    /// optionally updates the cursor, inside the caller's transaction.
    /// `GREATEST` makes the advance monotone even if callers race or a
    /// unit is retried after a partial failure: the marker can only move
    /// forward, never backward (§8 checkpoint-monotonicity property).
    pub async fn advance_checkpoint(
        tx: &mut Transaction<'_, Postgres>,
        stream_key: &str,
        marker: i64,
        cursor: Option<&str>,
    ) -> Result<(), PbsError> {
        sqlx::query(
            r#"
            UPDATE checkpoints
            SET last_processed_marker = GREATEST(last_processed_marker, $2),
                cursor = COALESCE($3, cursor)
            WHERE stream_key = $1
            "#,
        )
        .bind(stream_key)
        .bind(marker)
        .bind(cursor)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_checkpoint_completed(&self, stream_key: &str) -> Result<(), PbsError> {
        sqlx::query("UPDATE checkpoints SET completed = TRUE WHERE stream_key = $1")
            .bind(stream_key)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    stream_key: String,
    cursor: Option<String>,
    last_processed_marker: i64,
    completed: bool,
}

impl From<CheckpointRow> for Checkpoint {
    fn from(row: CheckpointRow) -> Self {
        Self {
            stream_key: row.stream_key,
            cursor: row.cursor,
            last_processed_marker: row.last_processed_marker,
            completed: row.completed,
        }
    }
}
