//! # Reply Trees
//!
//! Replies are stored flat and point at their parents by id. A [`ReplyTree`]
//! is an arena over one comment's replies with a child index per node; the
//! nested shape is produced on demand by walking that index, so no owning
//! parent/child pointers ever exist.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Comment, CommentReply};

/// Checks that a new reply's parents agree and returns its `reply_level`.
///
/// `parent_reply` is the already loaded reply being answered, if any.
/// Nothing is written by the caller unless this succeeds.
pub fn resolve_reply_level(
    thread_id: Uuid,
    parent_comment: &Comment,
    parent_reply: Option<&CommentReply>,
) -> Result<u32> {
    if parent_comment.thread_id != thread_id {
        return Err(AppError::ValidationMismatch(
            "parent comment does not belong to this thread".into(),
        ));
    }

    let Some(parent_reply) = parent_reply else {
        return Ok(1);
    };

    if parent_reply.parent_comment_id != parent_comment.id {
        return Err(AppError::ValidationMismatch(
            "parent reply does not belong to the same comment".into(),
        ));
    }
    if parent_reply.thread_id != thread_id {
        return Err(AppError::ValidationMismatch(
            "parent reply does not belong to the same thread".into(),
        ));
    }

    Ok(parent_reply.reply_level + 1)
}

/// A reply and its answers, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyNode {
    #[serde(flatten)]
    pub reply: CommentReply,
    pub replies: Vec<ReplyNode>,
}

/// A comment with its full reply tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<ReplyNode>,
}

/// Arena of one comment's replies, siblings ordered oldest first.
#[derive(Debug, Clone)]
pub struct ReplyTree {
    comment_id: Uuid,
    nodes: Vec<CommentReply>,
    /// Children of the root comment
    roots: Vec<usize>,
    children: HashMap<Uuid, Vec<usize>>,
}

impl ReplyTree {
    /// Indexes `replies` under `comment_id`. Replies of other comments are
    /// ignored, and so are replies whose parent reply is not in the set.
    pub fn build(comment_id: Uuid, replies: Vec<CommentReply>) -> Self {
        let mut nodes: Vec<CommentReply> = replies
            .into_iter()
            .filter(|r| r.parent_comment_id == comment_id)
            .collect();
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut roots = Vec::new();
        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, reply) in nodes.iter().enumerate() {
            match reply.parent_reply_id {
                None => roots.push(idx),
                Some(parent) => children.entry(parent).or_default().push(idx),
            }
        }

        Self { comment_id, nodes, roots, children }
    }

    pub fn comment_id(&self) -> Uuid {
        self.comment_id
    }

    /// Number of replies stored, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, pre-order walk yielding `(depth, reply)` with depth 1 for
    /// direct replies to the comment. Each call starts a fresh walk.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().map(|&idx| (1, idx)).collect(),
        }
    }

    /// Nested form of the tree, built bottom-up without recursion.
    pub fn into_nodes(self) -> Vec<ReplyNode> {
        let order: Vec<usize> = self.walk_indices().collect();
        let mut built: HashMap<usize, ReplyNode> = HashMap::with_capacity(order.len());

        for &idx in order.iter().rev() {
            let reply = self.nodes[idx].clone();
            let replies = self
                .child_indices(reply.id)
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(idx, ReplyNode { reply, replies });
        }

        self.roots.iter().filter_map(|idx| built.remove(idx)).collect()
    }

    fn child_indices(&self, reply_id: Uuid) -> &[usize] {
        self.children.get(&reply_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn walk_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let idx = stack.pop()?;
            stack.extend(self.child_indices(self.nodes[idx].id).iter().rev());
            Some(idx)
        })
    }
}

/// Lazy pre-order iterator over a [`ReplyTree`].
pub struct Walk<'a> {
    tree: &'a ReplyTree,
    stack: Vec<(u32, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (u32, &'a CommentReply);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, idx) = self.stack.pop()?;
        let reply = &self.tree.nodes[idx];
        self.stack.extend(
            self.tree
                .child_indices(reply.id)
                .iter()
                .rev()
                .map(|&child| (depth + 1, child)),
        );
        Some((depth, reply))
    }
}
