use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User ids are issued by the identity provider and treated as opaque strings.
pub type UserId = String;

/// The parts of a user shown next to a thread or in a member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

/// A direct reply, reduced to what a thread card needs (who replied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySummary {
    pub id: Uuid,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
}

/// A thread as listed on its author's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub community_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
    /// Authored threads and replies, oldest first.
    pub threads: Vec<ThreadSummary>,
    pub communities: Vec<CommunitySummary>,
    /// Saved thread ids in the order they were saved.
    pub saved: Vec<Uuid>,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_saved(&self, thread_id: Uuid) -> bool {
        self.saved.contains(&thread_id)
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub content: String,
    pub author: AuthorSummary,
    pub parent_id: Option<Uuid>,
    pub community: Option<CommunitySummary>,
    /// Direct replies, oldest first.
    pub children: Vec<ReplySummary>,
    /// Ids of users who liked the thread, in the order the likes arrived.
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn likes_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub members: Vec<AuthorSummary>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields written by an upsert. `image` and `bio` keep their stored
/// value when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileFields {
    pub name: String,
    pub username: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
}

/// What happens to the replies of a deleted thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Delete the whole reply subtree.
    #[default]
    Cascade,
    /// Delete only the thread; its direct replies become top-level threads.
    Detach,
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "detach" => Ok(Self::Detach),
            other => Err(format!("unknown delete policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_policy_parses_case_insensitively() {
        assert_eq!("Cascade".parse::<DeletePolicy>(), Ok(DeletePolicy::Cascade));
        assert_eq!(" detach ".parse::<DeletePolicy>(), Ok(DeletePolicy::Detach));
        assert!("orphan".parse::<DeletePolicy>().is_err());
    }

    #[test]
    fn likes_count_tracks_like_list() {
        let thread = Thread {
            id: Uuid::new_v4(),
            content: "hello".into(),
            author: AuthorSummary {
                id: "u1".into(),
                name: "Alice".into(),
                username: "alice".into(),
                image: None,
            },
            parent_id: None,
            community: None,
            children: vec![],
            likes: vec!["u2".into(), "u3".into()],
            created_at: Utc::now(),
        };

        assert_eq!(thread.likes_count(), 2);
        assert!(thread.is_liked_by("u3"));
        assert!(!thread.is_liked_by("u1"));
        assert!(!thread.is_reply());
    }
}
