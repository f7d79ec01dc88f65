//! # Sticky List Preferences
//!
//! The last filter/order a session used becomes its default. The value is
//! loaded by the API layer, passed by `&mut` through the list operation, and
//! saved back afterwards. Last write wins.

use serde::{Deserialize, Serialize};

use crate::ranking::{CommentOrder, ThreadFilter, ThreadOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListPrefs {
    pub thread_filter: ThreadFilter,
    pub thread_order: ThreadOrder,
    pub comment_order: CommentOrder,
}

impl ListPrefs {
    /// Resolves a thread listing request. Explicit parameters win and are
    /// remembered; omitted ones reuse the remembered values.
    pub fn resolve_threads(
        &mut self,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> (ThreadFilter, ThreadOrder) {
        if let Some(raw) = filter {
            self.thread_filter = ThreadFilter::parse_lenient(raw);
        }
        if let Some(raw) = order {
            self.thread_order = ThreadOrder::parse_lenient(raw);
        }
        (self.thread_filter, self.thread_order)
    }

    pub fn resolve_comments(&mut self, order: Option<&str>) -> CommentOrder {
        if let Some(raw) = order {
            self.comment_order = CommentOrder::parse_lenient(raw);
        }
        self.comment_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_stick_for_later_requests() {
        let mut prefs = ListPrefs::default();
        assert_eq!(
            prefs.resolve_threads(None, None),
            (ThreadFilter::All, ThreadOrder::CreatedAt)
        );

        prefs.resolve_threads(Some("links"), Some("points"));
        assert_eq!(
            prefs.resolve_threads(None, None),
            (ThreadFilter::Links, ThreadOrder::Points)
        );

        // Only the supplied half changes.
        assert_eq!(
            prefs.resolve_threads(Some("threads"), None),
            (ThreadFilter::Threads, ThreadOrder::Points)
        );
    }

    #[test]
    fn unknown_values_are_remembered_as_defaults() {
        let mut prefs = ListPrefs::default();
        prefs.resolve_threads(Some("links"), Some("points"));
        prefs.resolve_threads(Some("bogus"), Some("bogus"));
        assert_eq!(prefs.thread_filter, ThreadFilter::All);
        assert_eq!(prefs.thread_order, ThreadOrder::CreatedAt);
    }

    #[test]
    fn comment_order_is_kept_apart_from_thread_order() {
        let mut prefs = ListPrefs::default();
        prefs.resolve_threads(None, Some("points"));
        assert_eq!(prefs.resolve_comments(None), CommentOrder::Oldest);
        prefs.resolve_comments(Some("likes"));
        assert_eq!(prefs.resolve_comments(None), CommentOrder::Likes);
        assert_eq!(prefs.thread_order, ThreadOrder::Points);
    }
}
