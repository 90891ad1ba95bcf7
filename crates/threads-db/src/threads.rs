use rusqlite::{Connection, params};
use tracing::{debug, info};
use uuid::Uuid;

use threads_types::models::{DeletePolicy, ReplySummary, Thread};

use crate::decode::{now, parse_uuid};
use crate::models::{AuthorRow, ReplyRow, ThreadRow};
use crate::queries::{OptionalExt, query_ids, require};
use crate::{Database, EntityKind, Result, StoreError};

impl Database {
    /// Insert a thread, or a reply when `parent_id` is set. Every reference
    /// must resolve, otherwise nothing is written.
    pub fn create_thread(
        &self,
        content: &str,
        author_id: &str,
        parent_id: Option<Uuid>,
        community_id: Option<Uuid>,
    ) -> Result<Thread> {
        let id = Uuid::new_v4().to_string();
        let parent_id = parent_id.map(|p| p.to_string());
        let community_id = community_id.map(|c| c.to_string());

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            require(&tx, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", author_id)?;
            if let Some(parent_id) = &parent_id {
                require(&tx, EntityKind::Thread, "SELECT 1 FROM threads WHERE id = ?1", parent_id)?;
            }
            if let Some(community_id) = &community_id {
                require(
                    &tx,
                    EntityKind::Community,
                    "SELECT 1 FROM communities WHERE id = ?1",
                    community_id,
                )?;
            }

            tx.execute(
                "INSERT INTO threads (id, content, author_id, parent_id, community_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, content, author_id, parent_id, community_id, now()],
            )?;

            let thread = load_thread(&tx, &id)?;
            tx.commit()?;

            debug!("Thread {} created by {}", id, author_id);
            Ok(thread)
        })
    }

    pub fn get_thread(&self, id: Uuid) -> Result<Thread> {
        self.with_conn(|conn| load_thread(conn, &id.to_string()))
    }

    /// Full records of the direct replies to `id`, oldest first.
    pub fn get_replies(&self, id: Uuid) -> Result<Vec<Thread>> {
        let id = id.to_string();
        self.with_conn(|conn| {
            require(conn, EntityKind::Thread, "SELECT 1 FROM threads WHERE id = ?1", &id)?;

            query_ids(
                conn,
                "SELECT id FROM threads WHERE parent_id = ?1 ORDER BY created_at, rowid",
                &id,
            )?
            .iter()
            .map(|child| load_thread(conn, child))
            .collect()
        })
    }

    /// Delete a thread and handle its replies according to `policy`.
    /// Returns the ids of every deleted thread. Likes and saves of deleted
    /// threads go with them.
    pub fn delete_thread(&self, id: Uuid, policy: DeletePolicy) -> Result<Vec<Uuid>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            require(&tx, EntityKind::Thread, "SELECT 1 FROM threads WHERE id = ?1", &id)?;

            let deleted = match policy {
                DeletePolicy::Cascade => {
                    let subtree = query_ids(
                        &tx,
                        "WITH RECURSIVE subtree(id) AS (
                            SELECT id FROM threads WHERE id = ?1
                            UNION ALL
                            SELECT t.id FROM threads t JOIN subtree s ON t.parent_id = s.id
                         )
                         SELECT id FROM subtree",
                        &id,
                    )?;
                    tx.execute(
                        "WITH RECURSIVE subtree(id) AS (
                            SELECT id FROM threads WHERE id = ?1
                            UNION ALL
                            SELECT t.id FROM threads t JOIN subtree s ON t.parent_id = s.id
                         )
                         DELETE FROM threads WHERE id IN (SELECT id FROM subtree)",
                        [&id],
                    )?;
                    subtree
                }
                DeletePolicy::Detach => {
                    let detached = tx.execute(
                        "UPDATE threads SET parent_id = NULL WHERE parent_id = ?1",
                        [&id],
                    )?;
                    tx.execute("DELETE FROM threads WHERE id = ?1", [&id])?;
                    if detached > 0 {
                        debug!("Detached {} replies from thread {}", detached, id);
                    }
                    vec![id.clone()]
                }
            };

            tx.commit()?;

            info!("Deleted {} thread(s) rooted at {} ({:?})", deleted.len(), id, policy);
            deleted.iter().map(|d| parse_uuid("thread.id", d)).collect()
        })
    }
}

/// Read one thread with author and community populated, its direct replies
/// and its like-set.
pub(crate) fn load_thread(conn: &Connection, id: &str) -> Result<Thread> {
    let row = conn
        .query_row(
            "SELECT t.id, t.content, t.parent_id, t.created_at,
                    u.id, u.name, u.username, u.image,
                    t.community_id, c.name, c.image
             FROM threads t
             JOIN users u ON u.id = t.author_id
             LEFT JOIN communities c ON c.id = t.community_id
             WHERE t.id = ?1",
            [id],
            |row| {
                Ok(ThreadRow {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    parent_id: row.get(2)?,
                    created_at: row.get(3)?,
                    author: AuthorRow {
                        id: row.get(4)?,
                        name: row.get(5)?,
                        username: row.get(6)?,
                        image: row.get(7)?,
                    },
                    community_id: row.get(8)?,
                    community_name: row.get(9)?,
                    community_image: row.get(10)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(EntityKind::Thread, id))?;

    let children = {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.created_at, u.id, u.name, u.username, u.image
             FROM threads t
             JOIN users u ON u.id = t.author_id
             WHERE t.parent_id = ?1
             ORDER BY t.created_at, t.rowid",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok(ReplyRow {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    author: AuthorRow {
                        id: row.get(2)?,
                        name: row.get(3)?,
                        username: row.get(4)?,
                        image: row.get(5)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(ReplyRow::decode)
            .collect::<Result<Vec<ReplySummary>>>()?
    };

    let likes = query_ids(
        conn,
        "SELECT user_id FROM thread_likes WHERE thread_id = ?1 ORDER BY rowid",
        id,
    )?;

    row.decode(children, likes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{reply, thread, user};

    #[test]
    fn create_and_fetch_thread() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");

        let t1 = thread(&db, "u1", "hello");
        assert_eq!(t1.content, "hello");
        assert_eq!(t1.author.id, "u1");
        assert_eq!(t1.author.username, "alice");
        assert!(t1.likes.is_empty());
        assert_eq!(t1.likes_count(), 0);

        let fetched = db.get_thread(t1.id).unwrap();
        assert_eq!(fetched, t1);

        let alice = db.get_user("u1").unwrap();
        assert_eq!(alice.threads.len(), 1);
        assert_eq!(alice.threads[0].id, t1.id);
    }

    #[test]
    fn ghost_author_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_thread("hi", "ghost", None, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::User, .. }));
    }

    #[test]
    fn unresolved_parent_or_community_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");

        let err = db
            .create_thread("reply", "u1", Some(Uuid::new_v4()), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Thread, .. }));

        let err = db
            .create_thread("post", "u1", None, Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Community, .. }));

        assert!(db.get_user("u1").unwrap().threads.is_empty());
    }

    #[test]
    fn replies_form_a_tree() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        user(&db, "u2", "bob");

        let root = thread(&db, "u1", "root");
        let r1 = reply(&db, "u2", &root, "first");
        let r2 = reply(&db, "u1", &root, "second");

        let root = db.get_thread(root.id).unwrap();
        let child_ids: Vec<_> = root.children.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![r1.id, r2.id]);
        assert_eq!(root.children[0].author.username, "bob");

        let replies = db.get_replies(root.id).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].parent_id, Some(root.id));
        assert!(replies[0].is_reply());
    }

    #[test]
    fn threads_carry_their_community() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        let community = db.create_community("Rustaceans", Some("/crab.png"), "u1").unwrap();

        let t = db.create_thread("in a community", "u1", None, Some(community.id)).unwrap();
        let populated = t.community.unwrap();
        assert_eq!(populated.id, community.id);
        assert_eq!(populated.name, "Rustaceans");
        assert_eq!(populated.image.as_deref(), Some("/crab.png"));
    }

    #[test]
    fn cascade_delete_removes_whole_subtree() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        user(&db, "u2", "bob");

        let root = thread(&db, "u1", "root");
        let child = reply(&db, "u2", &root, "child");
        let grandchild = reply(&db, "u1", &child, "grandchild");
        let other = thread(&db, "u2", "unrelated");

        db.mutate_thread_likes(grandchild.id, "u2", true).unwrap();
        db.mutate_user_saved("u2", child.id, true).unwrap();

        let mut deleted = db.delete_thread(root.id, DeletePolicy::Cascade).unwrap();
        deleted.sort();
        let mut expected = vec![root.id, child.id, grandchild.id];
        expected.sort();
        assert_eq!(deleted, expected);

        for id in expected {
            assert!(matches!(db.get_thread(id), Err(StoreError::NotFound { .. })));
        }
        assert!(db.get_thread(other.id).is_ok());
        assert!(db.get_user("u2").unwrap().saved.is_empty());
    }

    #[test]
    fn detach_delete_promotes_replies() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");

        let root = thread(&db, "u1", "root");
        let child = reply(&db, "u1", &root, "child");
        let grandchild = reply(&db, "u1", &child, "grandchild");

        let deleted = db.delete_thread(root.id, DeletePolicy::Detach).unwrap();
        assert_eq!(deleted, vec![root.id]);

        let child = db.get_thread(child.id).unwrap();
        assert_eq!(child.parent_id, None);
        assert_eq!(child.children.len(), 1);
        assert_eq!(
            db.get_thread(grandchild.id).unwrap().parent_id,
            Some(child.id)
        );
    }

    #[test]
    fn deleting_missing_thread_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_thread(Uuid::new_v4(), DeletePolicy::Cascade),
            Err(StoreError::NotFound { kind: EntityKind::Thread, .. })
        ));
    }
}
