//! # Vote State Machine
//!
//! One vote row per (user, target). Repeating a direction toggles the vote
//! off; the opposite direction flips the existing row in place.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{VoteTarget, VoteType};

/// The write a vote action requires against the (user, target) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoteTransition {
    /// No row yet: insert one with this type
    Create(VoteType),
    /// Row exists with the other type: update it to this type
    Flip(VoteType),
    /// Row exists with the same type: delete it
    Remove,
}

impl VoteTransition {
    /// The (user, target) state once the write is applied.
    pub fn resulting_state(&self) -> Option<VoteType> {
        match self {
            VoteTransition::Create(t) | VoteTransition::Flip(t) => Some(*t),
            VoteTransition::Remove => None,
        }
    }
}

/// Toggle semantics used by the like/dislike actions.
pub fn transition(current: Option<VoteType>, action: VoteType) -> VoteTransition {
    match current {
        None => VoteTransition::Create(action),
        Some(existing) if existing == action => VoteTransition::Remove,
        Some(_) => VoteTransition::Flip(action),
    }
}

/// Explicit retraction of a vote in one direction. Only a vote of exactly
/// that direction can be retracted.
pub fn retraction(
    current: Option<VoteType>,
    direction: VoteType,
    target: VoteTarget,
) -> Result<VoteTransition> {
    match current {
        Some(existing) if existing == direction => Ok(VoteTransition::Remove),
        _ => Err(AppError::NotFound(
            format!("{direction} on {}", target.kind()),
            target.id().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use VoteType::{Dislike, Like};

    #[test]
    fn full_state_table() {
        assert_eq!(transition(None, Like), VoteTransition::Create(Like));
        assert_eq!(transition(None, Dislike), VoteTransition::Create(Dislike));
        assert_eq!(transition(Some(Like), Like), VoteTransition::Remove);
        assert_eq!(transition(Some(Like), Dislike), VoteTransition::Flip(Dislike));
        assert_eq!(transition(Some(Dislike), Like), VoteTransition::Flip(Like));
        assert_eq!(transition(Some(Dislike), Dislike), VoteTransition::Remove);
    }

    #[test]
    fn same_action_twice_returns_to_no_vote() {
        for action in [Like, Dislike] {
            let first = transition(None, action).resulting_state();
            let second = transition(first, action).resulting_state();
            assert_eq!(second, None);
        }
    }

    #[test]
    fn retraction_requires_matching_direction() {
        let target = VoteTarget::Thread(Uuid::now_v7());
        assert_eq!(retraction(Some(Like), Like, target).unwrap(), VoteTransition::Remove);
        assert!(matches!(
            retraction(Some(Dislike), Like, target),
            Err(AppError::NotFound(_, _))
        ));
        assert!(matches!(retraction(None, Dislike, target), Err(AppError::NotFound(_, _))));
    }
}
