//! Checked conversion from raw rows to typed records.
//!
//! Ids and timestamps are stored as TEXT. A value that does not parse is a
//! corrupt record and fails the whole read with `StoreError::InvalidRecord`
//! instead of being replaced by a default.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use threads_types::models::{
    AuthorSummary, Community, CommunitySummary, ReplySummary, Thread, ThreadSummary, User,
};

use crate::models::{AuthorRow, CommunityRow, ReplyRow, ThreadRow, ThreadSummaryRow, UserRow};
use crate::{Result, StoreError};

/// Timestamp for a new row. Millisecond RFC 3339 in UTC sorts lexically.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::InvalidRecord(format!("{} '{}' is not a uuid: {}", field, raw, e)))
}

pub fn parse_optional_uuid(field: &str, raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(|raw| parse_uuid(field, raw)).transpose()
}

pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') format, for rows written by hand.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::InvalidRecord(format!("{} '{}' is not a timestamp: {}", field, raw, e)))
}

impl AuthorRow {
    pub fn decode(self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            name: self.name,
            username: self.username,
            image: self.image,
        }
    }
}

pub fn community_summary(id: &str, name: String, image: Option<String>) -> Result<CommunitySummary> {
    Ok(CommunitySummary {
        id: parse_uuid("community.id", id)?,
        name,
        image,
    })
}

impl CommunityRow {
    pub fn decode(self, members: Vec<AuthorSummary>) -> Result<Community> {
        Ok(Community {
            id: parse_uuid("community.id", &self.id)?,
            created_at: parse_timestamp("community.created_at", &self.created_at)?,
            name: self.name,
            image: self.image,
            members,
        })
    }
}

impl ReplyRow {
    pub fn decode(self) -> Result<ReplySummary> {
        Ok(ReplySummary {
            id: parse_uuid("thread.id", &self.id)?,
            created_at: parse_timestamp("thread.created_at", &self.created_at)?,
            author: self.author.decode(),
        })
    }
}

impl ThreadSummaryRow {
    pub fn decode(self) -> Result<ThreadSummary> {
        Ok(ThreadSummary {
            id: parse_uuid("thread.id", &self.id)?,
            parent_id: parse_optional_uuid("thread.parent_id", self.parent_id.as_deref())?,
            community_id: parse_optional_uuid("thread.community_id", self.community_id.as_deref())?,
            created_at: parse_timestamp("thread.created_at", &self.created_at)?,
            content: self.content,
        })
    }
}

impl ThreadRow {
    pub fn decode(self, children: Vec<ReplySummary>, likes: Vec<String>) -> Result<Thread> {
        let community = match (self.community_id, self.community_name) {
            (Some(id), Some(name)) => Some(community_summary(&id, name, self.community_image)?),
            (None, _) => None,
            (Some(id), None) => {
                return Err(StoreError::InvalidRecord(format!(
                    "thread '{}' references missing community '{}'",
                    self.id, id
                )));
            }
        };

        Ok(Thread {
            id: parse_uuid("thread.id", &self.id)?,
            parent_id: parse_optional_uuid("thread.parent_id", self.parent_id.as_deref())?,
            created_at: parse_timestamp("thread.created_at", &self.created_at)?,
            content: self.content,
            author: self.author.decode(),
            community,
            children,
            likes,
        })
    }
}

/// Reference lists of a user, already read from their own tables.
pub struct UserLists {
    pub threads: Vec<ThreadSummary>,
    pub communities: Vec<CommunitySummary>,
    pub saved: Vec<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}

impl UserRow {
    pub fn decode(self, lists: UserLists) -> Result<User> {
        let saved = lists
            .saved
            .iter()
            .map(|id| parse_uuid("saved.thread_id", id))
            .collect::<Result<Vec<_>>>()?;

        Ok(User {
            created_at: parse_timestamp("user.created_at", &self.created_at)?,
            id: self.id,
            name: self.name,
            username: self.username,
            image: self.image,
            bio: self.bio,
            onboarded: self.onboarded,
            threads: lists.threads,
            communities: lists.communities,
            saved,
            followers: lists.followers,
            following: lists.following,
        })
    }
}
