use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserId;

/// Events pushed to connected clients after a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RealtimeEvent {
    /// The page at `path` shows stale data and should be refetched
    Revalidate { path: String },

    /// A thread or reply was posted
    ThreadCreated {
        thread_id: Uuid,
        author_id: UserId,
        parent_id: Option<Uuid>,
    },

    /// A thread was deleted, together with any replies listed in `deleted`
    ThreadDeleted { deleted: Vec<Uuid> },

    /// A user's like on a thread changed
    LikeChanged {
        thread_id: Uuid,
        user_id: UserId,
        liked: bool,
        likes_count: usize,
    },

    /// A user saved or unsaved a thread
    SaveChanged {
        thread_id: Uuid,
        user_id: UserId,
        saved: bool,
    },

    /// A follow relationship was created or removed
    FollowChanged {
        follower_id: UserId,
        followee_id: UserId,
        following: bool,
    },
}

impl RealtimeEvent {
    /// Returns the user this event is private to, if any.
    /// Saves are only visible to the user who made them; everything else is public.
    pub fn private_to(&self) -> Option<&str> {
        match self {
            Self::SaveChanged { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}
