use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use threads_types::api::normalize_username;
use threads_types::models::{AuthorSummary, Community, CommunitySummary, ProfileFields, User};

use crate::decode::{UserLists, community_summary, now};
use crate::models::{AuthorRow, CommunityRow, ThreadSummaryRow, UserRow};
use crate::{Database, EntityKind, Result, StoreError};

impl Database {
    // -- Users --

    pub fn get_user(&self, id: &str) -> Result<User> {
        self.with_conn(|conn| load_user(conn, id))
    }

    /// Create the user if absent, else merge `fields` into the stored record.
    /// Usernames are stored lower-cased. Fails with `Conflict` when another
    /// id already owns the username; in that case neither record is touched.
    pub fn upsert_user(&self, id: &str, fields: &ProfileFields) -> Result<User> {
        let username = normalize_username(&fields.username);
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let owner: Option<String> = tx
                .query_row(
                    "SELECT id FROM users WHERE username = ?1",
                    [&username],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(owner) = owner {
                if owner != id {
                    return Err(StoreError::Conflict(format!(
                        "username '{}' is already taken",
                        username
                    )));
                }
            }

            tx.execute(
                "INSERT INTO users (id, name, username, image, bio, onboarded, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    username = excluded.username,
                    image = COALESCE(excluded.image, users.image),
                    bio = COALESCE(excluded.bio, users.bio),
                    onboarded = MAX(users.onboarded, excluded.onboarded)",
                params![
                    id,
                    fields.name,
                    username,
                    fields.image,
                    fields.bio,
                    fields.onboarded,
                    now()
                ],
            )?;

            let user = load_user(&tx, id)?;
            tx.commit()?;

            debug!("Upserted user {} ({})", id, username);
            Ok(user)
        })
    }

    // -- Communities --

    /// Create a community with `creator_id` as its first member. Both rows
    /// are written in one transaction; an unknown creator writes nothing.
    pub fn create_community(
        &self,
        name: &str,
        image: Option<&str>,
        creator_id: &str,
    ) -> Result<Community> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            require(&tx, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", creator_id)?;

            tx.execute(
                "INSERT INTO communities (id, name, image, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, image, now()],
            )?;
            tx.execute(
                "INSERT INTO community_members (community_id, user_id) VALUES (?1, ?2)",
                params![id, creator_id],
            )?;

            let community = load_community(&tx, &id)?;
            tx.commit()?;
            Ok(community)
        })
    }

    pub fn get_community(&self, id: Uuid) -> Result<Community> {
        self.with_conn(|conn| load_community(conn, &id.to_string()))
    }

    /// Idempotent: joining twice keeps a single membership.
    pub fn add_community_member(&self, community_id: Uuid, user_id: &str) -> Result<Community> {
        let cid = community_id.to_string();
        self.with_conn_mut(|conn| {
            require(conn, EntityKind::Community, "SELECT 1 FROM communities WHERE id = ?1", &cid)?;
            require(conn, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", user_id)?;

            conn.execute(
                "INSERT OR IGNORE INTO community_members (community_id, user_id) VALUES (?1, ?2)",
                params![cid, user_id],
            )?;
            load_community(conn, &cid)
        })
    }
}

pub(crate) fn load_user(conn: &Connection, id: &str) -> Result<User> {
    let row = conn
        .query_row(
            "SELECT id, name, username, image, bio, onboarded, created_at FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                    image: row.get(3)?,
                    bio: row.get(4)?,
                    onboarded: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(EntityKind::User, id))?;

    let threads = {
        let mut stmt = conn.prepare(
            "SELECT id, content, parent_id, community_id, created_at
             FROM threads
             WHERE author_id = ?1
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok(ThreadSummaryRow {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    parent_id: row.get(2)?,
                    community_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(ThreadSummaryRow::decode)
            .collect::<Result<Vec<_>>>()?
    };

    let communities = {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.image
             FROM community_members m
             JOIN communities c ON c.id = m.community_id
             WHERE m.user_id = ?1
             ORDER BY m.rowid",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, name, image)| community_summary(&id, name, image))
            .collect::<Result<Vec<CommunitySummary>>>()?
    };

    let lists = UserLists {
        threads,
        communities,
        saved: query_ids(
            conn,
            "SELECT thread_id FROM saved_threads WHERE user_id = ?1 ORDER BY rowid",
            id,
        )?,
        followers: query_ids(
            conn,
            "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY rowid",
            id,
        )?,
        following: query_ids(
            conn,
            "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY rowid",
            id,
        )?,
    };

    row.decode(lists)
}

fn load_community(conn: &Connection, id: &str) -> Result<Community> {
    let row = conn
        .query_row(
            "SELECT id, name, image, created_at FROM communities WHERE id = ?1",
            [id],
            |row| {
                Ok(CommunityRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    image: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(EntityKind::Community, id))?;

    let mut stmt = conn.prepare(
        "SELECT u.id, u.name, u.username, u.image
         FROM community_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.community_id = ?1
         ORDER BY m.rowid",
    )?;
    let members = stmt
        .query_map([id], |row| {
            Ok(AuthorRow {
                id: row.get(0)?,
                name: row.get(1)?,
                username: row.get(2)?,
                image: row.get(3)?,
            })
        })?
        .map(|r| r.map(AuthorRow::decode))
        .collect::<std::result::Result<Vec<AuthorSummary>, _>>()?;

    row.decode(members)
}

/// Collect the single TEXT column of `sql`, bound to one id.
pub(crate) fn query_ids(conn: &Connection, sql: &str, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub(crate) fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool> {
    Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

/// Like `exists`, but a missing row is a `NotFound` for `kind`.
pub(crate) fn require(conn: &Connection, kind: EntityKind, sql: &str, id: &str) -> Result<()> {
    if exists(conn, sql, id)? {
        Ok(())
    } else {
        Err(StoreError::not_found(kind, id))
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
