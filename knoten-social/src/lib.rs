//! Social network clients used by knotenalarm.
//!
//! Only the Twitter/X pipeline is implemented. Callers talk to it through
//! [`FeedPoster`] so the announcement flow never needs to know which network
//! (or test double) sits behind it.
use async_trait::async_trait;
use knoten_common::Result;

pub mod twitter;

/// Receipt for a successfully published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    pub id: String,
    pub text: String,
}

/// Publishes a single plain-text status.
#[async_trait]
pub trait FeedPoster: Send + Sync {
    async fn post(&self, text: &str) -> Result<PostedStatus>;
}
