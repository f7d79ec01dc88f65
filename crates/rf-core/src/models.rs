//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Forum.
//! We use UUID v7 for time-ordered, globally unique identification.
//! Counter fields are denormalized; only Counter Maintenance writes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Maximum length for a thread title in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for a comment or reply body in characters.
pub const MAX_BODY_LENGTH: usize = 5000;

/// Maximum length for a magazine name or title in characters.
pub const MAX_MAGAZINE_NAME_LENGTH: usize = 200;

/// The authenticated identity attached to a request by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Public profile of a user with their activity totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    #[serde(flatten)]
    pub user: User,
    pub threads_count: i64,
    /// Comments and replies together
    pub comments_count: i64,
    pub boosts_count: i64,
}

/// A named community (e.g., "rust", "music") containing Threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Magazine {
    pub id: Uuid,
    /// Unique across the site
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub author_id: Uuid,
    pub publish_date: DateTime<Utc>,
    pub subscriptions_count: i64,
    pub threads_count: i64,
    pub comments_count: i64,
}

/// A top-level post (text or link) inside a Magazine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub magazine_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub body: String,
    /// Derived from `url`; kept on the struct for serialization
    pub is_link: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_likes: i64,
    pub num_dislikes: i64,
    pub num_points: i64,
    /// Direct comments plus every reply under this thread
    pub num_comments: i64,
    #[serde(flatten)]
    pub viewer: ViewerState,
}

/// A depth-0 comment on a Thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub magazine_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_likes: i64,
    pub num_dislikes: i64,
    /// Size of the whole reply tree rooted here
    pub num_replies: i64,
    #[serde(flatten)]
    pub viewer: ViewerState,
}

/// A reply inside a Comment's tree. Parents are ids, never owning pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentReply {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub magazine_id: Uuid,
    /// Root comment of the tree
    pub parent_comment_id: Uuid,
    /// `None` when replying directly to the root comment
    pub parent_reply_id: Option<Uuid>,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_likes: i64,
    pub num_dislikes: i64,
    /// Direct children only
    pub num_replies: i64,
    /// Fixed at creation: 1 under a comment, parent level + 1 under a reply
    pub reply_level: u32,
    #[serde(flatten)]
    pub viewer: ViewerState,
}

/// The requesting user's own marks on an entity. Every field is `None` for
/// anonymous requests; `user_has_boosted` is only ever set on threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    pub user_has_liked: Option<bool>,
    pub user_has_disliked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_has_boosted: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Like => "like",
            VoteType::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "like" => Ok(VoteType::Like),
            "dislike" => Ok(VoteType::Dislike),
            other => Err(AppError::ValidationError(format!("unknown vote type '{other}'"))),
        }
    }
}

/// Exactly one votable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Thread(Uuid),
    Comment(Uuid),
    Reply(Uuid),
}

impl VoteTarget {
    pub fn id(&self) -> Uuid {
        match self {
            VoteTarget::Thread(id) | VoteTarget::Comment(id) | VoteTarget::Reply(id) => *id,
        }
    }

    /// Human readable entity name, used in NotFound errors.
    pub fn kind(&self) -> &'static str {
        match self {
            VoteTarget::Thread(_) => "Thread",
            VoteTarget::Comment(_) => "Comment",
            VoteTarget::Reply(_) => "CommentReply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target: VoteTarget,
    pub vote_type: VoteType,
}

/// Result of a vote operation: the caller's state and the live counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub target: VoteTarget,
    /// `None` once the vote was toggled off
    pub state: Option<VoteType>,
    pub num_likes: i64,
    pub num_dislikes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub thread_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub magazine_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ── Write models ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewMagazine {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub rules: Option<String>,
}

impl NewMagazine {
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() || self.title.trim().is_empty() {
            return Err(AppError::ValidationError(
                "magazine name and title are required".into(),
            ));
        }
        if name.chars().count() > MAX_MAGAZINE_NAME_LENGTH
            || self.title.chars().count() > MAX_MAGAZINE_NAME_LENGTH
        {
            return Err(AppError::ValidationError(format!(
                "magazine name and title are limited to {MAX_MAGAZINE_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub magazine_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body: String,
}

impl NewThread {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

/// Partial update of a thread. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadEdit {
    pub title: Option<String>,
    /// `Some(None)` clears the url, turning a link into a text thread
    #[serde(default, with = "double_option")]
    pub url: Option<Option<String>>,
    pub body: Option<String>,
}

impl ThreadEdit {
    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// A comment or reply to be posted under a thread.
///
/// Which entity gets created depends on the parents:
/// neither → `Comment`, `parent_comment` only → level-1 reply,
/// both → nested reply, `parent_reply` alone → rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub parent_comment: Option<Uuid>,
    #[serde(default)]
    pub parent_reply: Option<Uuid>,
    pub body: String,
}

impl NewPost {
    pub fn validate(&self) -> Result<()> {
        validate_body(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub thread_id: Uuid,
    pub parent_comment_id: Uuid,
    pub parent_reply_id: Option<Uuid>,
    pub author_id: Uuid,
    pub body: String,
}

/// Either half of a "post comment" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum Posted {
    Comment(Comment),
    Reply(CommentReply),
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::ValidationError("title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::ValidationError(format!(
            "title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(AppError::ValidationError("body cannot be empty".into()));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(AppError::ValidationError(format!(
            "body exceeds maximum length of {MAX_BODY_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Distinguishes a missing field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}
