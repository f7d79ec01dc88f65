//! # rf-services
//!
//! Application operations on top of the `ForumRepo` port. The repository
//! owns persistence and counters; this layer owns request-shaped concerns:
//! sticky list preferences, in-memory ranking of mixed collections, reply
//! tree assembly, comment-vs-reply dispatch and the viewer's own marks.

use std::collections::HashMap;
use std::sync::Arc;

use rf_core::{
    rank_activity, preserve_rank, Activity, AppError, Boost, Comment, CommentReply,
    CommentThread, ForumRepo, ListPrefs, Magazine, MagazineOrder, NewComment, NewMagazine,
    NewPost, NewReply, NewThread, Posted, Principal, ReplyNode, ReplyTree, Result, Subscription,
    Thread, ThreadEdit, ThreadOrder, ThreadScope, User, UserInfo, Viewable, VoteOutcome, VoteTarget,
    VoteType,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ForumService {
    repo: Arc<dyn ForumRepo>,
}

impl ForumService {
    pub fn new(repo: Arc<dyn ForumRepo>) -> Self {
        Self { repo }
    }

    /// Mirrors an authenticated principal into the store.
    pub async fn register(&self, principal: &Principal) -> Result<User> {
        self.repo.ensure_user(principal).await
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    pub async fn user_info(&self, id: Uuid) -> Result<UserInfo> {
        self.repo
            .user_info(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    /// Fills in `viewer`'s likes, dislikes and boosts on everything inside
    /// `items`. Anonymous requests get `items` back untouched.
    pub async fn for_viewer<T: Viewable>(&self, viewer: Option<&Principal>, mut items: T) -> Result<T> {
        let Some(viewer) = viewer else {
            return Ok(items);
        };
        let mut targets = Vec::new();
        items.targets(&mut targets);
        if targets.is_empty() {
            return Ok(items);
        }
        let marks = self.repo.viewer_marks(viewer.id, &targets).await?;
        items.mark(&marks);
        Ok(items)
    }

    // ── Magazines ───────────────────────────────────────────────────────────

    pub async fn create_magazine(&self, actor: &Principal, magazine: NewMagazine) -> Result<Magazine> {
        magazine.validate()?;
        let created = self.repo.create_magazine(actor.id, magazine).await?;
        info!(magazine_id = %created.id, name = %created.name, "magazine created");
        Ok(created)
    }

    pub async fn magazine(&self, id: Uuid) -> Result<Magazine> {
        self.repo
            .get_magazine(id)
            .await?
            .ok_or_else(|| AppError::not_found("Magazine", id))
    }

    pub async fn list_magazines(&self, order: Option<&str>) -> Result<Vec<Magazine>> {
        let order = order.map(MagazineOrder::parse_lenient).unwrap_or_default();
        self.repo.list_magazines(order).await
    }

    pub async fn delete_magazine(&self, actor: &Principal, id: Uuid) -> Result<()> {
        self.repo.delete_magazine(actor.id, id).await?;
        info!(magazine_id = %id, "magazine deleted");
        Ok(())
    }

    pub async fn subscribe(&self, actor: &Principal, magazine_id: Uuid) -> Result<Subscription> {
        self.repo.subscribe(actor.id, magazine_id).await
    }

    pub async fn unsubscribe(&self, actor: &Principal, magazine_id: Uuid) -> Result<()> {
        self.repo.unsubscribe(actor.id, magazine_id).await
    }

    // ── Threads ─────────────────────────────────────────────────────────────

    pub async fn create_thread(&self, actor: &Principal, mut thread: NewThread) -> Result<Thread> {
        thread.url = normalize_url(thread.url);
        thread.validate()?;
        let created = self.repo.create_thread(actor.id, thread).await?;
        info!(thread_id = %created.id, magazine_id = %created.magazine_id, is_link = created.is_link, "thread created");
        Ok(created)
    }

    pub async fn thread(&self, id: Uuid) -> Result<Thread> {
        self.repo
            .get_thread(id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", id))
    }

    pub async fn update_thread(&self, actor: &Principal, id: Uuid, mut edit: ThreadEdit) -> Result<Thread> {
        edit.url = edit.url.map(normalize_url);
        edit.validate()?;
        self.repo.update_thread(actor.id, id, edit).await
    }

    pub async fn delete_thread(&self, actor: &Principal, id: Uuid) -> Result<()> {
        self.repo.delete_thread(actor.id, id).await?;
        info!(thread_id = %id, "thread deleted");
        Ok(())
    }

    /// Site-wide thread listing. Resolved filter/order are written back into `prefs`.
    pub async fn list_threads(
        &self,
        prefs: &mut ListPrefs,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Thread>> {
        self.scoped_threads(prefs, ThreadScope::All, filter, order).await
    }

    pub async fn magazine_threads(
        &self,
        prefs: &mut ListPrefs,
        magazine_id: Uuid,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Thread>> {
        self.magazine(magazine_id).await?;
        self.scoped_threads(prefs, ThreadScope::Magazine(magazine_id), filter, order)
            .await
    }

    pub async fn user_threads(
        &self,
        prefs: &mut ListPrefs,
        user_id: Uuid,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Thread>> {
        self.require_user(user_id).await?;
        self.scoped_threads(prefs, ThreadScope::Author(user_id), filter, order)
            .await
    }

    async fn scoped_threads(
        &self,
        prefs: &mut ListPrefs,
        scope: ThreadScope,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Thread>> {
        let (filter, order) = prefs.resolve_threads(filter, order);
        debug!(?scope, filter = filter.as_str(), order = order.as_str(), "listing threads");
        self.repo.list_threads(scope, filter, order).await
    }

    /// Title/body search. Blank queries match nothing. Does not touch
    /// sticky preferences.
    pub async fn search(&self, query: &str, order: Option<&str>) -> Result<Vec<Thread>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let order = order.map(ThreadOrder::parse_lenient).unwrap_or_default();
        self.repo.search_threads(query, order).await
    }

    /// Threads a user boosted, most recently boosted first.
    pub async fn boosted_threads(&self, user_id: Uuid) -> Result<Vec<Thread>> {
        self.require_user(user_id).await?;
        let ranked: Vec<Uuid> = self
            .repo
            .boosts_by_user(user_id)
            .await?
            .into_iter()
            .map(|b| b.thread_id)
            .collect();
        let threads = self.repo.threads_by_ids(&ranked).await?;
        Ok(preserve_rank(&ranked, threads, |t| t.id))
    }

    // ── Comments and replies ────────────────────────────────────────────────

    /// Posts a comment, or a reply when parents are given.
    pub async fn post_comment(&self, actor: &Principal, thread_id: Uuid, post: NewPost) -> Result<Posted> {
        post.validate()?;
        let posted = match (post.parent_comment, post.parent_reply) {
            (None, None) => self
                .repo
                .create_comment(NewComment { thread_id, author_id: actor.id, body: post.body })
                .await
                .map(Posted::Comment)?,
            (Some(parent_comment_id), parent_reply_id) => self
                .repo
                .create_reply(NewReply {
                    thread_id,
                    parent_comment_id,
                    parent_reply_id,
                    author_id: actor.id,
                    body: post.body,
                })
                .await
                .map(Posted::Reply)?,
            (None, Some(_)) => {
                return Err(AppError::ValidationMismatch(
                    "cannot reply to a reply without a parent comment".into(),
                ))
            }
        };
        match &posted {
            Posted::Comment(c) => info!(comment_id = %c.id, %thread_id, "comment posted"),
            Posted::Reply(r) => info!(reply_id = %r.id, %thread_id, level = r.reply_level, "reply posted"),
        }
        Ok(posted)
    }

    pub async fn comment(&self, id: Uuid) -> Result<Comment> {
        self.repo
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment", id))
    }

    pub async fn reply(&self, id: Uuid) -> Result<CommentReply> {
        self.repo
            .get_reply(id)
            .await?
            .ok_or_else(|| AppError::not_found("CommentReply", id))
    }

    pub async fn update_comment(&self, actor: &Principal, id: Uuid, body: String) -> Result<Comment> {
        rf_core::validate_body(&body)?;
        self.repo.update_comment(actor.id, id, body).await
    }

    pub async fn update_reply(&self, actor: &Principal, id: Uuid, body: String) -> Result<CommentReply> {
        rf_core::validate_body(&body)?;
        self.repo.update_reply(actor.id, id, body).await
    }

    pub async fn delete_comment(&self, actor: &Principal, id: Uuid) -> Result<()> {
        self.repo.delete_comment(actor.id, id).await
    }

    pub async fn delete_reply(&self, actor: &Principal, id: Uuid) -> Result<()> {
        self.repo.delete_reply(actor.id, id).await
    }

    /// The nested reply tree under one comment.
    pub async fn replies_of(&self, comment_id: Uuid) -> Result<Vec<ReplyNode>> {
        self.comment(comment_id).await?;
        let replies = self.repo.replies_of(comment_id).await?;
        Ok(ReplyTree::build(comment_id, replies).into_nodes())
    }

    /// Comments of a thread in the requested order, each with its reply tree.
    pub async fn thread_comments(
        &self,
        prefs: &mut ListPrefs,
        thread_id: Uuid,
        order: Option<&str>,
    ) -> Result<Vec<CommentThread>> {
        self.thread(thread_id).await?;
        let order = prefs.resolve_comments(order);
        let comments = self.repo.list_comments(thread_id, order).await?;

        let mut by_comment: HashMap<Uuid, Vec<CommentReply>> = HashMap::new();
        for reply in self.repo.replies_in_thread(thread_id).await? {
            by_comment.entry(reply.parent_comment_id).or_default().push(reply);
        }

        Ok(comments
            .into_iter()
            .map(|comment| {
                let replies = by_comment.remove(&comment.id).unwrap_or_default();
                let replies = ReplyTree::build(comment.id, replies).into_nodes();
                CommentThread { comment, replies }
            })
            .collect())
    }

    /// Everything a user wrote, comments and replies merged and ranked.
    pub async fn user_activity(
        &self,
        prefs: &mut ListPrefs,
        user_id: Uuid,
        order: Option<&str>,
    ) -> Result<Vec<Activity>> {
        self.require_user(user_id).await?;
        let order = prefs.resolve_comments(order);
        let comments = self.repo.comments_by_author(user_id).await?;
        let replies = self.repo.replies_by_author(user_id).await?;
        Ok(rank_activity(comments, replies, order))
    }

    // ── Votes and boosts ────────────────────────────────────────────────────

    pub async fn vote(&self, actor: &Principal, target: VoteTarget, action: VoteType) -> Result<VoteOutcome> {
        let outcome = self.repo.cast_vote(actor.id, target, action).await?;
        debug!(?target, %action, state = ?outcome.state, "vote applied");
        Ok(outcome)
    }

    pub async fn retract_vote(
        &self,
        actor: &Principal,
        target: VoteTarget,
        direction: VoteType,
    ) -> Result<VoteOutcome> {
        self.repo.retract_vote(actor.id, target, direction).await
    }

    pub async fn boost(&self, actor: &Principal, thread_id: Uuid) -> Result<Boost> {
        self.repo.boost(actor.id, thread_id).await
    }

    pub async fn unboost(&self, actor: &Principal, thread_id: Uuid) -> Result<()> {
        self.repo.unboost(actor.id, thread_id).await
    }
}

/// Blank urls are treated as absent so a form field left empty does not
/// turn a text thread into a link.
fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}
