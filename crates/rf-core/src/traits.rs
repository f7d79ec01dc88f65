//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Boost, Comment, CommentReply, Magazine, NewComment, NewMagazine, NewReply, NewThread,
    Principal, Subscription, Thread, ThreadEdit, User, UserInfo, VoteOutcome, VoteTarget, VoteType,
};
use crate::ranking::{CommentOrder, MagazineOrder, ThreadFilter, ThreadOrder};
use crate::session::ListPrefs;
use crate::viewer::ViewerMarks;

/// Which threads a listing draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadScope {
    All,
    Magazine(Uuid),
    Author(Uuid),
}

/// Content Store contract.
///
/// Every mutating method validates fully before writing, writes atomically,
/// and recounts the denormalized counters it affects before returning.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepo: Send + Sync {
    // User Operations
    async fn ensure_user(&self, principal: &Principal) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    /// The user with their thread, comment (replies included) and boost totals.
    async fn user_info(&self, id: Uuid) -> Result<Option<UserInfo>>;

    // Magazine Operations
    async fn create_magazine(&self, author_id: Uuid, magazine: NewMagazine) -> Result<Magazine>;
    async fn get_magazine(&self, id: Uuid) -> Result<Option<Magazine>>;
    async fn list_magazines(&self, order: MagazineOrder) -> Result<Vec<Magazine>>;
    async fn delete_magazine(&self, actor_id: Uuid, id: Uuid) -> Result<()>;
    /// Fails with `Conflict` when already subscribed.
    async fn subscribe(&self, user_id: Uuid, magazine_id: Uuid) -> Result<Subscription>;
    /// Fails with `NotFound` when not subscribed.
    async fn unsubscribe(&self, user_id: Uuid, magazine_id: Uuid) -> Result<()>;

    // Thread Operations
    async fn create_thread(&self, author_id: Uuid, thread: NewThread) -> Result<Thread>;
    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>>;
    async fn update_thread(&self, actor_id: Uuid, id: Uuid, edit: ThreadEdit) -> Result<Thread>;
    async fn delete_thread(&self, actor_id: Uuid, id: Uuid) -> Result<()>;
    async fn list_threads(
        &self,
        scope: ThreadScope,
        filter: ThreadFilter,
        order: ThreadOrder,
    ) -> Result<Vec<Thread>>;
    async fn search_threads(&self, query: &str, order: ThreadOrder) -> Result<Vec<Thread>>;
    /// Unordered; callers re-apply their own ranking.
    async fn threads_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Thread>>;

    // Comment Operations
    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;
    /// Fails with `ValidationMismatch` when the parents disagree.
    async fn create_reply(&self, reply: NewReply) -> Result<CommentReply>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    async fn get_reply(&self, id: Uuid) -> Result<Option<CommentReply>>;
    async fn update_comment(&self, actor_id: Uuid, id: Uuid, body: String) -> Result<Comment>;
    async fn update_reply(&self, actor_id: Uuid, id: Uuid, body: String) -> Result<CommentReply>;
    async fn delete_comment(&self, actor_id: Uuid, id: Uuid) -> Result<()>;
    async fn delete_reply(&self, actor_id: Uuid, id: Uuid) -> Result<()>;
    async fn list_comments(&self, thread_id: Uuid, order: CommentOrder) -> Result<Vec<Comment>>;
    /// Flat: every reply whose root is `comment_id`, in no particular order.
    async fn replies_of(&self, comment_id: Uuid) -> Result<Vec<CommentReply>>;
    async fn replies_in_thread(&self, thread_id: Uuid) -> Result<Vec<CommentReply>>;
    async fn comments_by_author(&self, user_id: Uuid) -> Result<Vec<Comment>>;
    async fn replies_by_author(&self, user_id: Uuid) -> Result<Vec<CommentReply>>;

    // Vote Operations
    /// Applies the toggle state machine for `action`.
    async fn cast_vote(
        &self,
        user_id: Uuid,
        target: VoteTarget,
        action: VoteType,
    ) -> Result<VoteOutcome>;
    /// Removes the caller's vote of `direction`; `NotFound` otherwise.
    async fn retract_vote(
        &self,
        user_id: Uuid,
        target: VoteTarget,
        direction: VoteType,
    ) -> Result<VoteOutcome>;

    // Boost Operations
    /// Fails with `Conflict` when already boosted.
    async fn boost(&self, user_id: Uuid, thread_id: Uuid) -> Result<Boost>;
    /// Fails with `NotFound` when not boosted.
    async fn unboost(&self, user_id: Uuid, thread_id: Uuid) -> Result<()>;
    /// Most recent first.
    async fn boosts_by_user(&self, user_id: Uuid) -> Result<Vec<Boost>>;

    /// The user's votes among `targets`, and which of the thread targets
    /// they boosted. Unknown users and targets simply have no marks.
    async fn viewer_marks(&self, user_id: Uuid, targets: &[VoteTarget]) -> Result<ViewerMarks>;
}

/// Per-session storage for sticky list preferences.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unknown sessions load the defaults.
    async fn load(&self, session_key: &str) -> Result<ListPrefs>;
    async fn save(&self, session_key: &str, prefs: ListPrefs) -> Result<()>;
}

/// Identity contract. Credentials are the provider's business; the core
/// trusts whatever principal it returns.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for an unknown token.
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>>;
}
