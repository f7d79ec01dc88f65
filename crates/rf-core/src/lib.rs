//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Forum:
//! models, ports, the reply tree, ranking, voting, viewer marks and sticky
//! preferences.

pub mod error;
pub mod models;
pub mod ranking;
pub mod session;
pub mod traits;
pub mod tree;
pub mod viewer;
pub mod voting;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ranking::*;
pub use session::*;
pub use traits::*;
pub use tree::*;
pub use viewer::*;
pub use voting::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_body_limits() {
        assert!(validate_body("hello").is_ok());
        assert!(validate_body("   ").is_err());
        assert!(validate_body(&"x".repeat(MAX_BODY_LENGTH)).is_ok());
        assert!(validate_body(&"x".repeat(MAX_BODY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_thread_edit_distinguishes_null_url() {
        let cleared: ThreadEdit = serde_json::from_str(r#"{"url": null}"#).unwrap();
        assert_eq!(cleared.url, Some(None));

        let untouched: ThreadEdit = serde_json::from_str(r#"{"title": "new"}"#).unwrap();
        assert_eq!(untouched.url, None);
        assert!(untouched.validate().is_ok());
    }

    #[test]
    fn test_vote_type_round_trips_through_str() {
        assert_eq!("like".parse::<VoteType>().unwrap(), VoteType::Like);
        assert_eq!(VoteType::Dislike.to_string(), "dislike");
        assert!("meh".parse::<VoteType>().is_err());
    }
}
