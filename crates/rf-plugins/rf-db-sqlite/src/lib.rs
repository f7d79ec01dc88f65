//! # rf-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rf-core` domain models.
//!
//! Every mutating method runs in one `BEGIN IMMEDIATE` transaction: validate,
//! write, recount the affected counters (see [`counters`]), commit. Failures
//! roll back by drop. Writers are serialized on the database write lock, so
//! the recounts never race.

mod counters;
mod rows;

use async_trait::async_trait;
use chrono::Utc;
use rf_core::error::{AppError, Result};
use rf_core::models::{
    Boost, Comment, CommentReply, Magazine, NewComment, NewMagazine, NewReply, NewThread,
    Principal, Subscription, Thread, ThreadEdit, User, UserInfo, ViewerState, VoteOutcome,
    VoteTarget, VoteType,
};
use rf_core::ranking::{CommentOrder, MagazineOrder, ThreadFilter, ThreadOrder};
use rf_core::traits::{ForumRepo, ThreadScope};
use rf_core::{resolve_reply_level, retraction, transition, ViewerMarks, VoteTransition};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rows::{
    comment_from_row, magazine_from_row, reply_from_row, thread_from_row, user_from_row,
    COMMENT_COLUMNS, MAGAZINE_COLUMNS, REPLY_COLUMNS, THREAD_COLUMNS,
};

/// How long a writer waits for the write lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ids bound per `IN (...)` list, well under SQLite's variable limit.
const MAX_BOUND_IDS: usize = 500;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

/// Maps driver errors onto the core taxonomy.
trait DbResultExt<T> {
    fn db(self) -> Result<T>;
    /// Like [`db`](DbResultExt::db), but a unique-index violation is a `Conflict`.
    fn db_conflict(self, message: &str) -> Result<T>;
}

impl<T> DbResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn db(self) -> Result<T> {
        self.map_err(|e| AppError::Internal(e.to_string()))
    }

    fn db_conflict(self, message: &str) -> Result<T> {
        self.map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Internal(e.to_string()),
        })
    }
}

fn ensure_author(author_id: Uuid, actor_id: Uuid, what: &str) -> Result<()> {
    if author_id != actor_id {
        warn!(%actor_id, "rejected change to {what} owned by another user");
        return Err(AppError::Forbidden(format!("you can only modify a {what} created by you")));
    }
    Ok(())
}

impl SqliteForumRepo {
    /// Connects and applies the embedded migrations.
    ///
    /// In-memory databases are bound to a single long-lived connection,
    /// otherwise each pooled connection would see its own empty database.
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_max_connections(url, 5).await
    }

    pub async fn with_max_connections(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .db()?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        }
        .connect_with(options)
        .await
        .db()?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        info!(url, "sqlite content store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write transaction holding the database write lock from its first
    /// statement. Concurrent writers wait up to [`BUSY_TIMEOUT`] for it, so
    /// their reads always see the previous writer's committed rows.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin_with("BEGIN IMMEDIATE").await.db()
    }
}

// ── Lookups shared by reads and transactional writes ────────────────────────

async fn fetch_magazine(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Magazine>> {
    let sql = format!("SELECT {MAGAZINE_COLUMNS} FROM magazines WHERE id = ?");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .db()?
        .map(|row| magazine_from_row(&row))
        .transpose()
        .db()
}

async fn fetch_thread(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Thread>> {
    let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .db()?
        .map(|row| thread_from_row(&row))
        .transpose()
        .db()
}

async fn fetch_comment(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Comment>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .db()?
        .map(|row| comment_from_row(&row))
        .transpose()
        .db()
}

async fn fetch_reply(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<CommentReply>> {
    let sql = format!("SELECT {REPLY_COLUMNS} FROM comment_replies WHERE id = ?");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .db()?
        .map(|row| reply_from_row(&row))
        .transpose()
        .db()
}

async fn current_vote(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    target: VoteTarget,
) -> Result<Option<(Uuid, VoteType)>> {
    let (_, column) = counters::vote_columns(target);
    let sql = format!("SELECT id, vote_type FROM votes WHERE user_id = ? AND {column} = ?");
    let row: Option<(Uuid, String)> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(target.id())
        .fetch_optional(&mut *conn)
        .await
        .db()?;
    row.map(|(id, kind)| Ok((id, kind.parse::<VoteType>()?))).transpose()
}

/// Writes a vote transition and returns the recounted outcome.
async fn apply_vote(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    target: VoteTarget,
    existing: Option<Uuid>,
    step: VoteTransition,
) -> Result<VoteOutcome> {
    match (step, existing) {
        (VoteTransition::Create(kind), _) => {
            let (_, column) = counters::vote_columns(target);
            let sql = format!("INSERT INTO votes (id, user_id, {column}, vote_type) VALUES (?, ?, ?, ?)");
            sqlx::query(&sql)
                .bind(Uuid::now_v7())
                .bind(user_id)
                .bind(target.id())
                .bind(kind.as_str())
                .execute(&mut *conn)
                .await
                .db_conflict("a vote for this target already exists")?;
        }
        (VoteTransition::Flip(kind), Some(vote_id)) => {
            sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
                .bind(kind.as_str())
                .bind(vote_id)
                .execute(&mut *conn)
                .await
                .db()?;
        }
        (VoteTransition::Remove, Some(vote_id)) => {
            sqlx::query("DELETE FROM votes WHERE id = ?")
                .bind(vote_id)
                .execute(&mut *conn)
                .await
                .db()?;
        }
        (_, None) => {
            return Err(AppError::Internal("vote transition without an existing vote row".into()))
        }
    }

    let (num_likes, num_dislikes) = counters::votes(conn, target).await.db()?;
    debug!(?target, ?step, "vote transition applied");
    Ok(VoteOutcome { target, state: step.resulting_state(), num_likes, num_dislikes })
}

fn thread_order_sql(order: ThreadOrder) -> &'static str {
    match order {
        ThreadOrder::CreatedAt => "created_at DESC, id DESC",
        ThreadOrder::Points => "num_points DESC, created_at DESC, id DESC",
        ThreadOrder::NumComments => "num_comments DESC, created_at DESC, id DESC",
    }
}

fn comment_order_sql(order: CommentOrder) -> &'static str {
    match order {
        CommentOrder::Newest => "created_at DESC, id DESC",
        CommentOrder::Oldest => "created_at ASC, id ASC",
        CommentOrder::Likes => "num_likes DESC, created_at DESC, id DESC",
    }
}

fn magazine_order_sql(order: MagazineOrder) -> &'static str {
    match order {
        MagazineOrder::Subscriptions => "subscriptions_count DESC, publish_date DESC, id DESC",
        MagazineOrder::Threads => "threads_count DESC, publish_date DESC, id DESC",
        MagazineOrder::Comments => "comments_count DESC, publish_date DESC, id DESC",
    }
}

/// Escapes LIKE wildcards so user queries match literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ForumRepo for SqliteForumRepo {
    async fn ensure_user(&self, principal: &Principal) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (id, username, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET username = excluded.username \
             RETURNING id, username, created_at",
        )
        .bind(principal.id)
        .bind(&principal.username)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .db()?;
        user_from_row(&row).db()
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .db()?
            .map(|row| user_from_row(&row))
            .transpose()
            .db()
    }

    async fn user_info(&self, id: Uuid) -> Result<Option<UserInfo>> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(None);
        };
        let (threads_count, comments_count, boosts_count): (i64, i64, i64) = sqlx::query_as(
            "SELECT \
               (SELECT COUNT(*) FROM threads WHERE author_id = ?1), \
               (SELECT COUNT(*) FROM comments WHERE author_id = ?1) \
                 + (SELECT COUNT(*) FROM comment_replies WHERE author_id = ?1), \
               (SELECT COUNT(*) FROM boosts WHERE user_id = ?1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .db()?;
        Ok(Some(UserInfo { user, threads_count, comments_count, boosts_count }))
    }

    async fn create_magazine(&self, author_id: Uuid, magazine: NewMagazine) -> Result<Magazine> {
        let created = Magazine {
            id: Uuid::now_v7(),
            name: magazine.name.trim().to_string(),
            title: magazine.title,
            description: magazine.description,
            rules: magazine.rules,
            author_id,
            publish_date: Utc::now(),
            subscriptions_count: 0,
            threads_count: 0,
            comments_count: 0,
        };

        sqlx::query(
            "INSERT INTO magazines (id, name, title, description, rules, author_id, publish_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(&created.name)
        .bind(&created.title)
        .bind(&created.description)
        .bind(&created.rules)
        .bind(created.author_id)
        .bind(created.publish_date)
        .execute(&self.pool)
        .await
        .db_conflict("a magazine with this name already exists")?;

        Ok(created)
    }

    async fn get_magazine(&self, id: Uuid) -> Result<Option<Magazine>> {
        let mut conn = self.pool.acquire().await.db()?;
        fetch_magazine(&mut conn, id).await
    }

    async fn list_magazines(&self, order: MagazineOrder) -> Result<Vec<Magazine>> {
        let sql = format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines ORDER BY {}",
            magazine_order_sql(order)
        );
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(magazine_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn delete_magazine(&self, actor_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        let magazine = fetch_magazine(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Magazine", id))?;
        ensure_author(magazine.author_id, actor_id, "magazine")?;

        sqlx::query("DELETE FROM magazines WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()
    }

    async fn subscribe(&self, user_id: Uuid, magazine_id: Uuid) -> Result<Subscription> {
        let mut tx = self.begin_write().await?;
        fetch_magazine(&mut tx, magazine_id)
            .await?
            .ok_or_else(|| AppError::not_found("Magazine", magazine_id))?;

        let subscription = Subscription {
            id: Uuid::now_v7(),
            user_id,
            magazine_id,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO subscriptions (id, user_id, magazine_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(subscription.id)
            .bind(user_id)
            .bind(magazine_id)
            .bind(subscription.created_at)
            .execute(&mut *tx)
            .await
            .db_conflict("already subscribed to this magazine")?;

        counters::subscriptions(&mut tx, magazine_id).await.db()?;
        tx.commit().await.db()?;
        Ok(subscription)
    }

    async fn unsubscribe(&self, user_id: Uuid, magazine_id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        fetch_magazine(&mut tx, magazine_id)
            .await?
            .ok_or_else(|| AppError::not_found("Magazine", magazine_id))?;

        let done = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND magazine_id = ?")
            .bind(user_id)
            .bind(magazine_id)
            .execute(&mut *tx)
            .await
            .db()?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Subscription", magazine_id));
        }

        counters::subscriptions(&mut tx, magazine_id).await.db()?;
        tx.commit().await.db()
    }

    async fn create_thread(&self, author_id: Uuid, thread: NewThread) -> Result<Thread> {
        let mut tx = self.begin_write().await?;
        fetch_magazine(&mut tx, thread.magazine_id)
            .await?
            .ok_or_else(|| AppError::not_found("Magazine", thread.magazine_id))?;

        let now = Utc::now();
        let created = Thread {
            id: Uuid::now_v7(),
            magazine_id: thread.magazine_id,
            author_id,
            is_link: thread.url.is_some(),
            title: thread.title,
            url: thread.url,
            body: thread.body,
            created_at: now,
            updated_at: now,
            num_likes: 0,
            num_dislikes: 0,
            num_points: 0,
            num_comments: 0,
            viewer: ViewerState::default(),
        };
        sqlx::query(
            "INSERT INTO threads (id, magazine_id, author_id, title, url, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(created.magazine_id)
        .bind(created.author_id)
        .bind(&created.title)
        .bind(&created.url)
        .bind(&created.body)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .db()?;

        counters::magazine(&mut tx, created.magazine_id).await.db()?;
        tx.commit().await.db()?;
        Ok(created)
    }

    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let mut conn = self.pool.acquire().await.db()?;
        fetch_thread(&mut conn, id).await
    }

    async fn update_thread(&self, actor_id: Uuid, id: Uuid, edit: ThreadEdit) -> Result<Thread> {
        let mut tx = self.begin_write().await?;
        let mut thread = fetch_thread(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", id))?;
        ensure_author(thread.author_id, actor_id, "thread")?;

        if let Some(title) = edit.title {
            thread.title = title;
        }
        if let Some(url) = edit.url {
            thread.is_link = url.is_some();
            thread.url = url;
        }
        if let Some(body) = edit.body {
            thread.body = body;
        }
        thread.updated_at = Utc::now();

        sqlx::query("UPDATE threads SET title = ?, url = ?, body = ?, updated_at = ? WHERE id = ?")
            .bind(&thread.title)
            .bind(&thread.url)
            .bind(&thread.body)
            .bind(thread.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()?;
        Ok(thread)
    }

    async fn delete_thread(&self, actor_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        let thread = fetch_thread(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", id))?;
        ensure_author(thread.author_id, actor_id, "thread")?;

        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        counters::magazine(&mut tx, thread.magazine_id).await.db()?;
        tx.commit().await.db()
    }

    async fn list_threads(
        &self,
        scope: ThreadScope,
        filter: ThreadFilter,
        order: ThreadOrder,
    ) -> Result<Vec<Thread>> {
        let (scope_sql, scope_id) = match scope {
            ThreadScope::All => ("1 = 1", None),
            ThreadScope::Magazine(id) => ("magazine_id = ?", Some(id)),
            ThreadScope::Author(id) => ("author_id = ?", Some(id)),
        };
        let filter_sql = match filter {
            ThreadFilter::All => "1 = 1",
            ThreadFilter::Threads => "url IS NULL",
            ThreadFilter::Links => "url IS NOT NULL",
        };
        let sql = format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE {scope_sql} AND {filter_sql} ORDER BY {}",
            thread_order_sql(order)
        );

        let mut query = sqlx::query(&sql);
        if let Some(id) = scope_id {
            query = query.bind(id);
        }
        query
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(thread_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn search_threads(&self, query: &str, order: ThreadOrder) -> Result<Vec<Thread>> {
        let pattern = like_pattern(query);
        let sql = format!(
            "SELECT {THREAD_COLUMNS} FROM threads \
             WHERE title LIKE ? ESCAPE '\\' OR body LIKE ? ESCAPE '\\' \
             ORDER BY {}",
            thread_order_sql(order)
        );
        sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(thread_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn threads_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Thread>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(thread_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tx = self.begin_write().await?;
        let thread = fetch_thread(&mut tx, comment.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", comment.thread_id))?;

        let now = Utc::now();
        let created = Comment {
            id: Uuid::now_v7(),
            thread_id: thread.id,
            magazine_id: thread.magazine_id,
            author_id: comment.author_id,
            body: comment.body,
            created_at: now,
            updated_at: now,
            num_likes: 0,
            num_dislikes: 0,
            num_replies: 0,
            viewer: ViewerState::default(),
        };
        sqlx::query(
            "INSERT INTO comments (id, thread_id, magazine_id, author_id, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(created.thread_id)
        .bind(created.magazine_id)
        .bind(created.author_id)
        .bind(&created.body)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .db()?;

        counters::discussion(&mut tx, thread.id, thread.magazine_id, None).await.db()?;
        tx.commit().await.db()?;
        Ok(created)
    }

    async fn create_reply(&self, reply: NewReply) -> Result<CommentReply> {
        let mut tx = self.begin_write().await?;
        let thread = fetch_thread(&mut tx, reply.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", reply.thread_id))?;
        let parent_comment = fetch_comment(&mut tx, reply.parent_comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment", reply.parent_comment_id))?;
        let parent_reply = match reply.parent_reply_id {
            Some(id) => Some(
                fetch_reply(&mut tx, id)
                    .await?
                    .ok_or_else(|| AppError::not_found("CommentReply", id))?,
            ),
            None => None,
        };

        let reply_level = resolve_reply_level(thread.id, &parent_comment, parent_reply.as_ref())
            .inspect_err(|e| warn!(thread_id = %thread.id, "reply rejected: {e}"))?;

        let now = Utc::now();
        let created = CommentReply {
            id: Uuid::now_v7(),
            thread_id: thread.id,
            magazine_id: thread.magazine_id,
            parent_comment_id: parent_comment.id,
            parent_reply_id: reply.parent_reply_id,
            author_id: reply.author_id,
            body: reply.body,
            created_at: now,
            updated_at: now,
            num_likes: 0,
            num_dislikes: 0,
            num_replies: 0,
            viewer: ViewerState::default(),
            reply_level,
        };
        sqlx::query(
            "INSERT INTO comment_replies \
             (id, thread_id, magazine_id, parent_comment_id, parent_reply_id, author_id, body, created_at, updated_at, reply_level) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(created.thread_id)
        .bind(created.magazine_id)
        .bind(created.parent_comment_id)
        .bind(created.parent_reply_id)
        .bind(created.author_id)
        .bind(&created.body)
        .bind(created.created_at)
        .bind(created.updated_at)
        .bind(created.reply_level)
        .execute(&mut *tx)
        .await
        .db()?;

        counters::discussion(&mut tx, thread.id, thread.magazine_id, Some(parent_comment.id))
            .await
            .db()?;
        tx.commit().await.db()?;
        Ok(created)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let mut conn = self.pool.acquire().await.db()?;
        fetch_comment(&mut conn, id).await
    }

    async fn get_reply(&self, id: Uuid) -> Result<Option<CommentReply>> {
        let mut conn = self.pool.acquire().await.db()?;
        fetch_reply(&mut conn, id).await
    }

    async fn update_comment(&self, actor_id: Uuid, id: Uuid, body: String) -> Result<Comment> {
        let mut tx = self.begin_write().await?;
        let mut comment = fetch_comment(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment", id))?;
        ensure_author(comment.author_id, actor_id, "comment")?;

        comment.body = body;
        comment.updated_at = Utc::now();
        sqlx::query("UPDATE comments SET body = ?, updated_at = ? WHERE id = ?")
            .bind(&comment.body)
            .bind(comment.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()?;
        Ok(comment)
    }

    async fn update_reply(&self, actor_id: Uuid, id: Uuid, body: String) -> Result<CommentReply> {
        let mut tx = self.begin_write().await?;
        let mut reply = fetch_reply(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("CommentReply", id))?;
        ensure_author(reply.author_id, actor_id, "reply")?;

        reply.body = body;
        reply.updated_at = Utc::now();
        sqlx::query("UPDATE comment_replies SET body = ?, updated_at = ? WHERE id = ?")
            .bind(&reply.body)
            .bind(reply.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()?;
        Ok(reply)
    }

    async fn delete_comment(&self, actor_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        let comment = fetch_comment(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment", id))?;
        ensure_author(comment.author_id, actor_id, "comment")?;

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        counters::discussion(&mut tx, comment.thread_id, comment.magazine_id, None)
            .await
            .db()?;
        tx.commit().await.db()
    }

    async fn delete_reply(&self, actor_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        let reply = fetch_reply(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("CommentReply", id))?;
        ensure_author(reply.author_id, actor_id, "reply")?;

        sqlx::query("DELETE FROM comment_replies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .db()?;
        counters::discussion(
            &mut tx,
            reply.thread_id,
            reply.magazine_id,
            Some(reply.parent_comment_id),
        )
        .await
        .db()?;
        tx.commit().await.db()
    }

    async fn list_comments(&self, thread_id: Uuid, order: CommentOrder) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE thread_id = ? ORDER BY {}",
            comment_order_sql(order)
        );
        sqlx::query(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(comment_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn replies_of(&self, comment_id: Uuid) -> Result<Vec<CommentReply>> {
        let sql = format!("SELECT {REPLY_COLUMNS} FROM comment_replies WHERE parent_comment_id = ?");
        sqlx::query(&sql)
            .bind(comment_id)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(reply_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn replies_in_thread(&self, thread_id: Uuid) -> Result<Vec<CommentReply>> {
        let sql = format!("SELECT {REPLY_COLUMNS} FROM comment_replies WHERE thread_id = ?");
        sqlx::query(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(reply_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn comments_by_author(&self, user_id: Uuid) -> Result<Vec<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE author_id = ?");
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(comment_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn replies_by_author(&self, user_id: Uuid) -> Result<Vec<CommentReply>> {
        let sql = format!("SELECT {REPLY_COLUMNS} FROM comment_replies WHERE author_id = ?");
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .db()?
            .iter()
            .map(reply_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .db()
    }

    async fn cast_vote(&self, user_id: Uuid, target: VoteTarget, action: VoteType) -> Result<VoteOutcome> {
        let mut tx = self.begin_write().await?;
        if !counters::claim_vote_target(&mut tx, target).await.db()? {
            return Err(AppError::not_found(target.kind(), target.id()));
        }

        let existing = current_vote(&mut tx, user_id, target).await?;
        let step = transition(existing.map(|(_, kind)| kind), action);
        let outcome = apply_vote(&mut tx, user_id, target, existing.map(|(id, _)| id), step).await?;
        tx.commit().await.db()?;
        Ok(outcome)
    }

    async fn retract_vote(
        &self,
        user_id: Uuid,
        target: VoteTarget,
        direction: VoteType,
    ) -> Result<VoteOutcome> {
        let mut tx = self.begin_write().await?;
        if !counters::claim_vote_target(&mut tx, target).await.db()? {
            return Err(AppError::not_found(target.kind(), target.id()));
        }

        let existing = current_vote(&mut tx, user_id, target).await?;
        let step = retraction(existing.map(|(_, kind)| kind), direction, target)?;
        let outcome = apply_vote(&mut tx, user_id, target, existing.map(|(id, _)| id), step).await?;
        tx.commit().await.db()?;
        Ok(outcome)
    }

    async fn boost(&self, user_id: Uuid, thread_id: Uuid) -> Result<Boost> {
        let mut tx = self.begin_write().await?;
        fetch_thread(&mut tx, thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", thread_id))?;

        let boost = Boost { id: Uuid::now_v7(), user_id, thread_id, created_at: Utc::now() };
        sqlx::query("INSERT INTO boosts (id, user_id, thread_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(boost.id)
            .bind(user_id)
            .bind(thread_id)
            .bind(boost.created_at)
            .execute(&mut *tx)
            .await
            .db_conflict("the user has already boosted this thread")?;

        sqlx::query("UPDATE threads SET num_points = num_points + 1 WHERE id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()?;
        Ok(boost)
    }

    async fn unboost(&self, user_id: Uuid, thread_id: Uuid) -> Result<()> {
        let mut tx = self.begin_write().await?;
        fetch_thread(&mut tx, thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", thread_id))?;

        let done = sqlx::query("DELETE FROM boosts WHERE user_id = ? AND thread_id = ?")
            .bind(user_id)
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .db()?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Boost", thread_id));
        }

        sqlx::query("UPDATE threads SET num_points = num_points - 1 WHERE id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .db()?;
        tx.commit().await.db()
    }

    async fn boosts_by_user(&self, user_id: Uuid) -> Result<Vec<Boost>> {
        let rows: Vec<(Uuid, Uuid, Uuid, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, user_id, thread_id, created_at FROM boosts \
             WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .db()?;
        Ok(rows
            .into_iter()
            .map(|(id, user_id, thread_id, created_at)| Boost { id, user_id, thread_id, created_at })
            .collect())
    }

    async fn viewer_marks(&self, user_id: Uuid, targets: &[VoteTarget]) -> Result<ViewerMarks> {
        let mut marks = ViewerMarks::default();

        let mut by_column: HashMap<&'static str, Vec<VoteTarget>> = HashMap::new();
        for target in targets {
            let (_, column) = counters::vote_columns(*target);
            by_column.entry(column).or_default().push(*target);
        }
        for (column, group) in by_column {
            for chunk in group.chunks(MAX_BOUND_IDS) {
                let by_id: HashMap<Uuid, VoteTarget> = chunk.iter().map(|t| (t.id(), *t)).collect();
                let sql = format!(
                    "SELECT {column}, vote_type FROM votes WHERE user_id = ? AND {column} IN ({})",
                    placeholders(chunk.len())
                );
                let mut query = sqlx::query_as::<_, (Uuid, String)>(&sql).bind(user_id);
                for target in chunk {
                    query = query.bind(target.id());
                }
                for (id, kind) in query.fetch_all(&self.pool).await.db()? {
                    if let Some(target) = by_id.get(&id) {
                        marks.votes.insert(*target, kind.parse()?);
                    }
                }
            }
        }

        let thread_ids: Vec<Uuid> = targets
            .iter()
            .filter_map(|t| match t {
                VoteTarget::Thread(id) => Some(*id),
                _ => None,
            })
            .collect();
        for chunk in thread_ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "SELECT thread_id FROM boosts WHERE user_id = ? AND thread_id IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query_scalar::<_, Uuid>(&sql).bind(user_id);
            for id in chunk {
                query = query.bind(*id);
            }
            marks.boosts.extend(query.fetch_all(&self.pool).await.db()?);
        }

        debug!(%user_id, targets = targets.len(), votes = marks.votes.len(), "viewer marks loaded");
        Ok(marks)
    }
}
