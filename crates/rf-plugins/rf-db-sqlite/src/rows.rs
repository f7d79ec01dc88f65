//! Row to domain model mapping. Column lists live next to their mappers so
//! every SELECT projects exactly what the mapper reads.

use rf_core::models::{Comment, CommentReply, Magazine, Thread, User, ViewerState};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub(crate) const MAGAZINE_COLUMNS: &str = "id, name, title, description, rules, author_id, \
    publish_date, subscriptions_count, threads_count, comments_count";

pub(crate) const THREAD_COLUMNS: &str = "id, magazine_id, author_id, title, url, body, \
    created_at, updated_at, num_likes, num_dislikes, num_points, num_comments";

pub(crate) const COMMENT_COLUMNS: &str = "id, thread_id, magazine_id, author_id, body, \
    created_at, updated_at, num_likes, num_dislikes, num_replies";

pub(crate) const REPLY_COLUMNS: &str = "id, thread_id, magazine_id, parent_comment_id, \
    parent_reply_id, author_id, body, created_at, updated_at, num_likes, num_dislikes, \
    num_replies, reply_level";

pub(crate) fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn magazine_from_row(row: &SqliteRow) -> sqlx::Result<Magazine> {
    Ok(Magazine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        rules: row.try_get("rules")?,
        author_id: row.try_get("author_id")?,
        publish_date: row.try_get("publish_date")?,
        subscriptions_count: row.try_get("subscriptions_count")?,
        threads_count: row.try_get("threads_count")?,
        comments_count: row.try_get("comments_count")?,
    })
}

/// `is_link` is not stored; it follows from `url`.
pub(crate) fn thread_from_row(row: &SqliteRow) -> sqlx::Result<Thread> {
    let url: Option<String> = row.try_get("url")?;
    Ok(Thread {
        id: row.try_get("id")?,
        magazine_id: row.try_get("magazine_id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        is_link: url.is_some(),
        url,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        num_likes: row.try_get("num_likes")?,
        num_dislikes: row.try_get("num_dislikes")?,
        num_points: row.try_get("num_points")?,
        num_comments: row.try_get("num_comments")?,
        viewer: ViewerState::default(),
    })
}

pub(crate) fn comment_from_row(row: &SqliteRow) -> sqlx::Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        magazine_id: row.try_get("magazine_id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        num_likes: row.try_get("num_likes")?,
        num_dislikes: row.try_get("num_dislikes")?,
        num_replies: row.try_get("num_replies")?,
        viewer: ViewerState::default(),
    })
}

pub(crate) fn reply_from_row(row: &SqliteRow) -> sqlx::Result<CommentReply> {
    Ok(CommentReply {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        magazine_id: row.try_get("magazine_id")?,
        parent_comment_id: row.try_get("parent_comment_id")?,
        parent_reply_id: row.try_get("parent_reply_id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        num_likes: row.try_get("num_likes")?,
        num_dislikes: row.try_get("num_dislikes")?,
        num_replies: row.try_get("num_replies")?,
        viewer: ViewerState::default(),
        reply_level: row.try_get("reply_level")?,
    })
}
