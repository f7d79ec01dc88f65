//! # Ranking and Filtering
//!
//! Filter and order directives for list views. Parsing is lenient: an
//! unknown value resolves to the default instead of failing the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use uuid::Uuid;

use crate::models::{Comment, CommentReply, Magazine, Thread};

/// Which kinds of threads a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadFilter {
    #[default]
    All,
    /// Text threads (no url)
    Threads,
    /// Link threads (url present)
    Links,
}

impl ThreadFilter {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "threads" => ThreadFilter::Threads,
            "links" => ThreadFilter::Links,
            _ => ThreadFilter::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadFilter::All => "all",
            ThreadFilter::Threads => "threads",
            ThreadFilter::Links => "links",
        }
    }

    pub fn matches(&self, thread: &Thread) -> bool {
        match self {
            ThreadFilter::All => true,
            ThreadFilter::Threads => thread.url.is_none(),
            ThreadFilter::Links => thread.url.is_some(),
        }
    }
}

/// Thread ordering; every variant is descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadOrder {
    #[default]
    CreatedAt,
    Points,
    NumComments,
}

impl ThreadOrder {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "points" => ThreadOrder::Points,
            "num_comments" => ThreadOrder::NumComments,
            _ => ThreadOrder::CreatedAt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadOrder::CreatedAt => "created_at",
            ThreadOrder::Points => "points",
            ThreadOrder::NumComments => "num_comments",
        }
    }

    /// Ties fall back to newest first, then to id, so results are stable.
    pub fn compare(&self, a: &Thread, b: &Thread) -> Ordering {
        let primary = match self {
            ThreadOrder::CreatedAt => Ordering::Equal,
            ThreadOrder::Points => b.num_points.cmp(&a.num_points),
            ThreadOrder::NumComments => b.num_comments.cmp(&a.num_comments),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Ordering of comment and reply collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentOrder {
    Newest,
    #[default]
    Oldest,
    /// Most liked first, newer first among equals
    Likes,
}

impl CommentOrder {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "newest" => CommentOrder::Newest,
            "likes" => CommentOrder::Likes,
            _ => CommentOrder::Oldest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentOrder::Newest => "newest",
            CommentOrder::Oldest => "oldest",
            CommentOrder::Likes => "likes",
        }
    }

    pub fn compare<T: Rankable>(&self, a: &T, b: &T) -> Ordering {
        match self {
            CommentOrder::Newest => b
                .created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id())),
            CommentOrder::Oldest => a
                .created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id())),
            CommentOrder::Likes => b
                .num_likes()
                .cmp(&a.num_likes())
                .then_with(|| b.created_at().cmp(&a.created_at()))
                .then_with(|| b.id().cmp(&a.id())),
        }
    }
}

/// Magazine directory ordering; every variant is descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagazineOrder {
    #[default]
    Subscriptions,
    Threads,
    Comments,
}

impl MagazineOrder {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "threads" => MagazineOrder::Threads,
            "comments" => MagazineOrder::Comments,
            _ => MagazineOrder::Subscriptions,
        }
    }

    pub fn compare(&self, a: &Magazine, b: &Magazine) -> Ordering {
        let primary = match self {
            MagazineOrder::Subscriptions => b.subscriptions_count.cmp(&a.subscriptions_count),
            MagazineOrder::Threads => b.threads_count.cmp(&a.threads_count),
            MagazineOrder::Comments => b.comments_count.cmp(&a.comments_count),
        };
        primary
            .then_with(|| b.publish_date.cmp(&a.publish_date))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// What the comment comparators need from an entity.
pub trait Rankable {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn num_likes(&self) -> i64;
}

impl Rankable for Comment {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn num_likes(&self) -> i64 {
        self.num_likes
    }
}

impl Rankable for CommentReply {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn num_likes(&self) -> i64 {
        self.num_likes
    }
}

/// One entry of a mixed comment + reply collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum Activity {
    Comment(Comment),
    Reply(CommentReply),
}

impl Rankable for Activity {
    fn id(&self) -> Uuid {
        match self {
            Activity::Comment(c) => c.id,
            Activity::Reply(r) => r.id,
        }
    }
    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Activity::Comment(c) => c.created_at,
            Activity::Reply(r) => r.created_at,
        }
    }
    fn num_likes(&self) -> i64 {
        match self {
            Activity::Comment(c) => c.num_likes,
            Activity::Reply(r) => r.num_likes,
        }
    }
}

/// Merges comments and replies into one sequence sorted in memory, since
/// the two kinds live in separate tables and share no database ordering.
pub fn rank_activity(comments: Vec<Comment>, replies: Vec<CommentReply>, order: CommentOrder) -> Vec<Activity> {
    let mut merged: Vec<Activity> = comments
        .into_iter()
        .map(Activity::Comment)
        .chain(replies.into_iter().map(Activity::Reply))
        .collect();
    merged.sort_by(|a, b| order.compare(a, b));
    merged
}

/// Re-applies a ranking to a re-materialized collection: each item lands at
/// the position of its key in `ranked`. Items whose key is not ranked are
/// dropped; ranked keys with no item are skipped.
pub fn preserve_rank<T, K, F>(ranked: &[K], items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let position: HashMap<&K, usize> = ranked.iter().enumerate().map(|(pos, k)| (k, pos)).collect();
    let mut slotted: Vec<(usize, T)> = items
        .into_iter()
        .filter_map(|item| position.get(&key(&item)).map(|&pos| (pos, item)))
        .collect();
    slotted.sort_by_key(|(pos, _)| *pos);
    slotted.into_iter().map(|(_, item)| item).collect()
}
