//! # Viewer State
//!
//! Listings are the same for everyone. What the requesting user liked,
//! disliked or boosted is looked up in one batch afterwards and written onto
//! each entity's [`ViewerState`].

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{Comment, CommentReply, Posted, Thread, ViewerState, VoteTarget, VoteType};
use crate::ranking::Activity;
use crate::tree::{CommentThread, ReplyNode};

/// One user's votes and boosts over a set of targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerMarks {
    pub votes: HashMap<VoteTarget, VoteType>,
    /// Boosted thread ids
    pub boosts: HashSet<Uuid>,
}

impl ViewerMarks {
    pub fn state_of(&self, target: VoteTarget) -> ViewerState {
        let vote = self.votes.get(&target).copied();
        ViewerState {
            user_has_liked: Some(vote == Some(VoteType::Like)),
            user_has_disliked: Some(vote == Some(VoteType::Dislike)),
            user_has_boosted: match target {
                VoteTarget::Thread(id) => Some(self.boosts.contains(&id)),
                VoteTarget::Comment(_) | VoteTarget::Reply(_) => None,
            },
        }
    }
}

/// Anything that serializes threads, comments or replies.
pub trait Viewable {
    /// Pushes every votable entity contained in `self`.
    fn targets(&self, out: &mut Vec<VoteTarget>);
    fn mark(&mut self, marks: &ViewerMarks);
}

impl Viewable for Thread {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        out.push(VoteTarget::Thread(self.id));
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        self.viewer = marks.state_of(VoteTarget::Thread(self.id));
    }
}

impl Viewable for Comment {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        out.push(VoteTarget::Comment(self.id));
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        self.viewer = marks.state_of(VoteTarget::Comment(self.id));
    }
}

impl Viewable for CommentReply {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        out.push(VoteTarget::Reply(self.id));
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        self.viewer = marks.state_of(VoteTarget::Reply(self.id));
    }
}

// Trees are walked with an explicit stack, like `ReplyTree` itself.
impl Viewable for ReplyNode {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.reply.targets(out);
            stack.extend(node.replies.iter());
        }
    }

    fn mark(&mut self, marks: &ViewerMarks) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.reply.mark(marks);
            stack.extend(node.replies.iter_mut());
        }
    }
}

impl Viewable for CommentThread {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        self.comment.targets(out);
        self.replies.targets(out);
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        self.comment.mark(marks);
        self.replies.mark(marks);
    }
}

impl Viewable for Activity {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        match self {
            Activity::Comment(c) => c.targets(out),
            Activity::Reply(r) => r.targets(out),
        }
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        match self {
            Activity::Comment(c) => c.mark(marks),
            Activity::Reply(r) => r.mark(marks),
        }
    }
}

impl Viewable for Posted {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        match self {
            Posted::Comment(c) => c.targets(out),
            Posted::Reply(r) => r.targets(out),
        }
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        match self {
            Posted::Comment(c) => c.mark(marks),
            Posted::Reply(r) => r.mark(marks),
        }
    }
}

impl<T: Viewable> Viewable for Vec<T> {
    fn targets(&self, out: &mut Vec<VoteTarget>) {
        for item in self {
            item.targets(out);
        }
    }
    fn mark(&mut self, marks: &ViewerMarks) {
        for item in self {
            item.mark(marks);
        }
    }
}
