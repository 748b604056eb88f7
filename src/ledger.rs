//! Relation ledger: idempotent like/subscribe toggling.
//!
//! The ledger never does a plain read-then-decide-then-write sequence.
//! Presence is flipped through the store's two conflict-aware primitives,
//! so any interleaving of concurrent togglers on the same tuple leaves
//! exactly one of {present, absent} and never a duplicate row.

use tokio::time::Instant;
use tracing::warn;

use crate::db::{Database, RelationKind};

/// Errors surfaced by ledger operations. Both are retryable; a caller that
/// retries a toggle after `DeadlineExceeded` relies on the flip being
/// idempotent, not on knowing whether the first attempt committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller's deadline expired before the store responded
    DeadlineExceeded,
    /// Ledger storage error
    StoreUnavailable,
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::DeadlineExceeded => write!(f, "Deadline exceeded"),
            LedgerError::StoreUnavailable => write!(f, "Ledger storage unavailable"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Owns the toggle algorithm over the uniqueness-constrained relation table.
#[derive(Clone)]
pub struct RelationLedger {
    db: Database,
}

impl RelationLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Flip the presence of (actor, kind, target). Returns the state after
    /// this call: true when the relation now exists.
    ///
    /// Reconciliation of the three concurrent outcomes:
    /// - our insert won the unique index: the relation is now present;
    /// - the row already existed (originally, or a concurrent insert beat
    ///   us to it): fall through and delete it;
    /// - the delete affected zero rows (a concurrent delete beat us): the
    ///   end state "absent" already holds, which is still success.
    pub async fn toggle(
        &self,
        actor_id: i64,
        kind: RelationKind,
        target_id: &str,
        deadline: Instant,
    ) -> Result<bool, LedgerError> {
        let inserted = store_call(
            deadline,
            self.db.relations().insert_if_absent(actor_id, kind, target_id),
        )
        .await?;
        if inserted {
            return Ok(true);
        }

        let _removed = store_call(
            deadline,
            self.db.relations().delete_if_present(actor_id, kind, target_id),
        )
        .await?;
        Ok(false)
    }

    /// Unordered target ids the actor holds a relation of `kind` to.
    pub async fn list_by_actor(
        &self,
        actor_id: i64,
        kind: RelationKind,
        deadline: Instant,
    ) -> Result<Vec<String>, LedgerError> {
        store_call(deadline, self.db.relations().list_targets(actor_id, kind)).await
    }
}

async fn store_call<T>(
    deadline: Instant,
    fut: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, LedgerError> {
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(error = %e, "Ledger storage error");
            Err(LedgerError::StoreUnavailable)
        }
        Err(_) => Err(LedgerError::DeadlineExceeded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn setup() -> (RelationLedger, Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let actor = db
            .users()
            .create(
                &uuid::Uuid::new_v4().to_string(),
                "alice",
                "alice@example.com",
                "hash",
            )
            .await
            .unwrap();
        (RelationLedger::new(db.clone()), db, actor)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    #[tokio::test]
    async fn test_toggle_flips_presence() {
        let (ledger, db, actor) = setup().await;

        let first = ledger
            .toggle(actor, RelationKind::VideoLike, "video-1", far_deadline())
            .await
            .unwrap();
        assert!(first, "first toggle creates the relation");

        let second = ledger
            .toggle(actor, RelationKind::VideoLike, "video-1", far_deadline())
            .await
            .unwrap();
        assert!(!second, "second toggle removes it");

        let rows = db
            .relations()
            .count_rows(actor, RelationKind::VideoLike, "video-1")
            .await
            .unwrap();
        assert_eq!(rows, 0, "no row remains after an even number of toggles");
    }

    #[tokio::test]
    async fn test_odd_toggle_count_ends_present() {
        let (ledger, db, actor) = setup().await;

        for _ in 0..5 {
            ledger
                .toggle(actor, RelationKind::Subscription, "channel-1", far_deadline())
                .await
                .unwrap();
        }

        assert!(
            db.relations()
                .exists(actor, RelationKind::Subscription, "channel-1")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_concurrent_toggles_never_duplicate() {
        let (ledger, db, actor) = setup().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .toggle(actor, RelationKind::TweetLike, "tweet-1", far_deadline())
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Which toggler controls the final state is unpredictable; the
        // invariant is that the tuple ends in exactly one of
        // {present, absent} with no duplicate rows.
        let rows = db
            .relations()
            .count_rows(actor, RelationKind::TweetLike, "tweet-1")
            .await
            .unwrap();
        assert!(rows <= 1, "unique index must never be violated");
    }

    #[tokio::test]
    async fn test_toggle_tuples_are_independent() {
        let (ledger, db, actor) = setup().await;

        ledger
            .toggle(actor, RelationKind::VideoLike, "v1", far_deadline())
            .await
            .unwrap();
        ledger
            .toggle(actor, RelationKind::VideoLike, "v2", far_deadline())
            .await
            .unwrap();
        ledger
            .toggle(actor, RelationKind::VideoLike, "v1", far_deadline())
            .await
            .unwrap();

        let targets = db
            .relations()
            .list_targets(actor, RelationKind::VideoLike)
            .await
            .unwrap();
        assert_eq!(targets, vec!["v2"]);
    }

    #[tokio::test]
    async fn test_list_by_actor() {
        let (ledger, _db, actor) = setup().await;

        for target in ["c1", "c2", "c3"] {
            ledger
                .toggle(actor, RelationKind::Subscription, target, far_deadline())
                .await
                .unwrap();
        }
        ledger
            .toggle(actor, RelationKind::Subscription, "c2", far_deadline())
            .await
            .unwrap();

        let mut subs = ledger
            .list_by_actor(actor, RelationKind::Subscription, far_deadline())
            .await
            .unwrap();
        subs.sort();
        assert_eq!(subs, vec!["c1", "c3"]);
    }
}
