//! # Counter Maintenance
//!
//! Denormalized counters are recomputed as full recounts from the rows
//! currently visible to the transaction, never as deltas. Each mutating
//! repository method calls the recounts it needs explicitly, on the same
//! connection as its write, before committing.
//!
//! Boost points are the one exception: `num_points` moves by ±1 next to the
//! boost row insert/delete, which the unique index already serializes.

use rf_core::VoteTarget;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

/// `(table, votes column)` holding the counters of a vote target.
pub(crate) fn vote_columns(target: VoteTarget) -> (&'static str, &'static str) {
    match target {
        VoteTarget::Thread(_) => ("threads", "thread_id"),
        VoteTarget::Comment(_) => ("comments", "comment_id"),
        VoteTarget::Reply(_) => ("comment_replies", "reply_id"),
    }
}

/// Takes the write lock on the target row before the vote is read, so
/// concurrent votes on the same target run one after the other.
/// Returns `false` when the target does not exist.
pub(crate) async fn claim_vote_target(conn: &mut SqliteConnection, target: VoteTarget) -> sqlx::Result<bool> {
    let (table, _) = vote_columns(target);
    let sql = format!("UPDATE {table} SET num_likes = num_likes WHERE id = ?");
    let done = sqlx::query(&sql).bind(target.id()).execute(&mut *conn).await?;
    Ok(done.rows_affected() == 1)
}

/// Rewrites `num_likes` / `num_dislikes` from the vote rows of `target`.
/// `updated_at` is left alone: counters are metadata, not content.
pub(crate) async fn votes(conn: &mut SqliteConnection, target: VoteTarget) -> sqlx::Result<(i64, i64)> {
    let (table, column) = vote_columns(target);
    let sql = format!(
        "UPDATE {table} SET \
            num_likes = (SELECT COUNT(*) FROM votes WHERE {column} = ? AND vote_type = 'like'), \
            num_dislikes = (SELECT COUNT(*) FROM votes WHERE {column} = ? AND vote_type = 'dislike') \
         WHERE id = ? \
         RETURNING num_likes, num_dislikes"
    );
    let id = target.id();
    let counts: (i64, i64) = sqlx::query_as(&sql)
        .bind(id)
        .bind(id)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    debug!(?target, likes = counts.0, dislikes = counts.1, "vote counters recounted");
    Ok(counts)
}

/// `num_comments` = direct comments + every reply under the thread.
pub(crate) async fn thread_comments(conn: &mut SqliteConnection, thread_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE threads SET num_comments = \
            (SELECT COUNT(*) FROM comments WHERE thread_id = ?) + \
            (SELECT COUNT(*) FROM comment_replies WHERE thread_id = ?) \
         WHERE id = ?",
    )
    .bind(thread_id)
    .bind(thread_id)
    .bind(thread_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// The root comment counts its whole tree; each reply counts its direct children.
pub(crate) async fn reply_tree(conn: &mut SqliteConnection, comment_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE comments SET num_replies = \
            (SELECT COUNT(*) FROM comment_replies WHERE parent_comment_id = ?) \
         WHERE id = ?",
    )
    .bind(comment_id)
    .bind(comment_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE comment_replies SET num_replies = \
            (SELECT COUNT(*) FROM comment_replies AS child WHERE child.parent_reply_id = comment_replies.id) \
         WHERE parent_comment_id = ?",
    )
    .bind(comment_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// `threads_count` and `comments_count` (sum of the threads' `num_comments`).
pub(crate) async fn magazine(conn: &mut SqliteConnection, magazine_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE magazines SET \
            threads_count = (SELECT COUNT(*) FROM threads WHERE magazine_id = ?), \
            comments_count = (SELECT COALESCE(SUM(num_comments), 0) FROM threads WHERE magazine_id = ?) \
         WHERE id = ?",
    )
    .bind(magazine_id)
    .bind(magazine_id)
    .bind(magazine_id)
    .execute(&mut *conn)
    .await?;
    debug!(%magazine_id, "magazine counters recounted");
    Ok(())
}

pub(crate) async fn subscriptions(conn: &mut SqliteConnection, magazine_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE magazines SET subscriptions_count = \
            (SELECT COUNT(*) FROM subscriptions WHERE magazine_id = ?) \
         WHERE id = ?",
    )
    .bind(magazine_id)
    .bind(magazine_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Everything that depends on a thread's comments and replies.
pub(crate) async fn discussion(
    conn: &mut SqliteConnection,
    thread_id: Uuid,
    magazine_id: Uuid,
    comment_id: Option<Uuid>,
) -> sqlx::Result<()> {
    if let Some(comment_id) = comment_id {
        reply_tree(conn, comment_id).await?;
    }
    thread_comments(conn, thread_id).await?;
    magazine(conn, magazine_id).await
}
