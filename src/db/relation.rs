//! Relation row storage.
//!
//! One row per (actor, kind, target) tuple, guarded by a unique index.
//! The store exposes affected-row-count primitives; the toggle algorithm
//! that builds on them lives in the ledger.

use sqlx::sqlite::SqlitePool;

/// Kind of relation between a user and a target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    VideoLike,
    CommentLike,
    TweetLike,
    Subscription,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::VideoLike => "video-like",
            RelationKind::CommentLike => "comment-like",
            RelationKind::TweetLike => "tweet-like",
            RelationKind::Subscription => "subscription",
        }
    }
}

/// Store for relation rows.
#[derive(Clone)]
pub struct RelationStore {
    pool: SqlitePool,
}

impl RelationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the tuple unless it already exists. Returns true when this
    /// call created the row; false when the unique index rejected it.
    pub async fn insert_if_absent(
        &self,
        actor_id: i64,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO relations (actor_id, kind, target_id) VALUES (?, ?, ?)
             ON CONFLICT (actor_id, kind, target_id) DO NOTHING",
        )
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(target_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the tuple if present. Returns true when this call removed the
    /// row; false when it was already gone.
    pub async fn delete_if_present(
        &self,
        actor_id: i64,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM relations WHERE actor_id = ? AND kind = ? AND target_id = ?",
        )
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(target_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether the tuple currently exists.
    pub async fn exists(
        &self,
        actor_id: i64,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM relations WHERE actor_id = ? AND kind = ? AND target_id = ?",
        )
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    /// List target ids for an actor and kind. Unordered.
    pub async fn list_targets(
        &self,
        actor_id: i64,
        kind: RelationKind,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT target_id FROM relations WHERE actor_id = ? AND kind = ?",
        )
        .bind(actor_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Count rows for a tuple (for tests asserting the uniqueness invariant).
    pub async fn count_rows(
        &self,
        actor_id: i64,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM relations WHERE actor_id = ? AND kind = ? AND target_id = ?",
        )
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}
