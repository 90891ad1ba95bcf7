use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use threads_types::models::Thread;

use crate::decode::{now, parse_uuid};
use crate::queries::{query_ids, require};
use crate::threads::load_thread;
use crate::{Database, EntityKind, Result, StoreError};

/// A set-membership relationship that can be added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement<'a> {
    /// `user_id` in the like-set of `thread_id`
    Like { thread_id: Uuid, user_id: &'a str },
    /// `thread_id` in the saved list of `user_id`
    Save { user_id: &'a str, thread_id: Uuid },
    /// `follower_id` follows `followee_id`
    Follow {
        follower_id: &'a str,
        followee_id: &'a str,
    },
}

/// State of a relationship right after a write, read under the same lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    pub member: bool,
    /// Size of the set the write touched: the thread's likes, the user's
    /// saved list, or the followee's followers.
    pub count: usize,
}

impl Database {
    pub fn mutate_thread_likes(&self, thread_id: Uuid, user_id: &str, add: bool) -> Result<()> {
        self.set_engagement(Engagement::Like { thread_id, user_id }, add)?;
        Ok(())
    }

    pub fn mutate_user_saved(&self, user_id: &str, thread_id: Uuid, add: bool) -> Result<()> {
        self.set_engagement(Engagement::Save { user_id, thread_id }, add)?;
        Ok(())
    }

    /// Both sides of the relationship live in one row, so followers and
    /// following always change together.
    pub fn mutate_follow(&self, follower_id: &str, followee_id: &str, add: bool) -> Result<()> {
        self.set_engagement(
            Engagement::Follow {
                follower_id,
                followee_id,
            },
            add,
        )?;
        Ok(())
    }

    /// Idempotent add or remove.
    pub fn set_engagement(&self, engagement: Engagement<'_>, add: bool) -> Result<Toggled> {
        self.with_conn_mut(|conn| {
            apply(conn, engagement, add)?;
            Ok(Toggled {
                member: add,
                count: set_size(conn, engagement)?,
            })
        })
    }

    /// Invert the current membership inside one writer critical section.
    pub fn flip_engagement(&self, engagement: Engagement<'_>) -> Result<Toggled> {
        self.with_conn_mut(|conn| {
            let add = !is_member(conn, engagement)?;
            apply(conn, engagement, add)?;
            Ok(Toggled {
                member: add,
                count: set_size(conn, engagement)?,
            })
        })
    }

    /// Ids of the threads `user_id` has saved. Empty for an id with no user
    /// record, so any viewer can ask.
    pub fn saved_thread_ids(&self, user_id: &str) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            query_ids(
                conn,
                "SELECT thread_id FROM saved_threads WHERE user_id = ?1 ORDER BY rowid",
                user_id,
            )?
            .iter()
            .map(|id| parse_uuid("saved_threads.thread_id", id))
            .collect()
        })
    }

    /// The user's saved threads in the order they were saved, each fully
    /// populated.
    pub fn get_saved_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        self.with_conn(|conn| {
            require(conn, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", user_id)?;

            query_ids(
                conn,
                "SELECT thread_id FROM saved_threads WHERE user_id = ?1 ORDER BY rowid",
                user_id,
            )?
            .iter()
            .map(|id| load_thread(conn, id))
            .collect()
        })
    }
}

/// Every referenced record must exist. Removing a save only needs the user,
/// so a stale save on a deleted thread can still be cleared.
fn check_targets(conn: &Connection, engagement: Engagement<'_>, add: bool) -> Result<()> {
    match engagement {
        Engagement::Like { thread_id, .. } => require(
            conn,
            EntityKind::Thread,
            "SELECT 1 FROM threads WHERE id = ?1",
            &thread_id.to_string(),
        ),
        Engagement::Save { user_id, thread_id } => {
            require(conn, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", user_id)?;
            if add {
                require(
                    conn,
                    EntityKind::Thread,
                    "SELECT 1 FROM threads WHERE id = ?1",
                    &thread_id.to_string(),
                )?;
            }
            Ok(())
        }
        Engagement::Follow {
            follower_id,
            followee_id,
        } => {
            if follower_id == followee_id {
                return Err(StoreError::Conflict(format!(
                    "user '{}' cannot follow themselves",
                    follower_id
                )));
            }
            require(conn, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", follower_id)?;
            require(conn, EntityKind::User, "SELECT 1 FROM users WHERE id = ?1", followee_id)
        }
    }
}

fn apply(conn: &Connection, engagement: Engagement<'_>, add: bool) -> Result<()> {
    check_targets(conn, engagement, add)?;

    let changed = match (engagement, add) {
        (Engagement::Like { thread_id, user_id }, true) => conn.execute(
            "INSERT OR IGNORE INTO thread_likes (thread_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![thread_id.to_string(), user_id, now()],
        )?,
        (Engagement::Like { thread_id, user_id }, false) => conn.execute(
            "DELETE FROM thread_likes WHERE thread_id = ?1 AND user_id = ?2",
            params![thread_id.to_string(), user_id],
        )?,
        (Engagement::Save { user_id, thread_id }, true) => conn.execute(
            "INSERT OR IGNORE INTO saved_threads (user_id, thread_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, thread_id.to_string(), now()],
        )?,
        (Engagement::Save { user_id, thread_id }, false) => conn.execute(
            "DELETE FROM saved_threads WHERE user_id = ?1 AND thread_id = ?2",
            params![user_id, thread_id.to_string()],
        )?,
        (
            Engagement::Follow {
                follower_id,
                followee_id,
            },
            true,
        ) => conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
            params![follower_id, followee_id, now()],
        )?,
        (
            Engagement::Follow {
                follower_id,
                followee_id,
            },
            false,
        ) => conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?,
    };

    if changed == 0 {
        debug!("{:?} already {}", engagement, if add { "present" } else { "absent" });
    }
    Ok(())
}

fn set_size(conn: &Connection, engagement: Engagement<'_>) -> Result<usize> {
    let (sql, key) = match engagement {
        Engagement::Like { thread_id, .. } => (
            "SELECT COUNT(*) FROM thread_likes WHERE thread_id = ?1",
            thread_id.to_string(),
        ),
        Engagement::Save { user_id, .. } => (
            "SELECT COUNT(*) FROM saved_threads WHERE user_id = ?1",
            user_id.to_string(),
        ),
        Engagement::Follow { followee_id, .. } => (
            "SELECT COUNT(*) FROM follows WHERE followee_id = ?1",
            followee_id.to_string(),
        ),
    };
    let count: i64 = conn.query_row(sql, [&key], |row| row.get(0))?;
    Ok(count as usize)
}

fn is_member(conn: &Connection, engagement: Engagement<'_>) -> Result<bool> {
    let found = match engagement {
        Engagement::Like { thread_id, user_id } => conn.query_row(
            "SELECT 1 FROM thread_likes WHERE thread_id = ?1 AND user_id = ?2",
            params![thread_id.to_string(), user_id],
            |_| Ok(()),
        ),
        Engagement::Save { user_id, thread_id } => conn.query_row(
            "SELECT 1 FROM saved_threads WHERE user_id = ?1 AND thread_id = ?2",
            params![user_id, thread_id.to_string()],
            |_| Ok(()),
        ),
        Engagement::Follow {
            follower_id,
            followee_id,
        } => conn.query_row(
            "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
            |_| Ok(()),
        ),
    };

    match found {
        Ok(()) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{thread, user};

    #[test]
    fn like_then_unlike_scenario() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        let t1 = thread(&db, "u1", "hello");

        // The liker does not need a user record
        db.mutate_thread_likes(t1.id, "u2", true).unwrap();
        let t = db.get_thread(t1.id).unwrap();
        assert_eq!(t.likes, vec!["u2".to_string()]);
        assert_eq!(t.likes_count(), 1);

        db.mutate_thread_likes(t1.id, "u2", false).unwrap();
        let t = db.get_thread(t1.id).unwrap();
        assert!(t.likes.is_empty());
        assert_eq!(t.likes_count(), 0);
    }

    #[test]
    fn repeated_adds_keep_one_entry() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        let t1 = thread(&db, "u1", "hello");

        db.mutate_thread_likes(t1.id, "u2", true).unwrap();
        db.mutate_thread_likes(t1.id, "u2", true).unwrap();
        db.mutate_thread_likes(t1.id, "u3", true).unwrap();
        assert_eq!(db.get_thread(t1.id).unwrap().likes, vec!["u2", "u3"]);

        // Removing an absent like is a no-op
        let like = Engagement::Like {
            thread_id: t1.id,
            user_id: "u4",
        };
        let outcome = db.set_engagement(like, false).unwrap();
        assert_eq!(outcome, Toggled { member: false, count: 2 });
    }

    #[test]
    fn liking_missing_thread_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.mutate_thread_likes(Uuid::new_v4(), "u1", true),
            Err(StoreError::NotFound { kind: EntityKind::Thread, .. })
        ));
    }

    #[test]
    fn saved_list_is_an_ordered_set() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        let a = thread(&db, "u1", "a");
        let b = thread(&db, "u1", "b");

        db.mutate_user_saved("u1", b.id, true).unwrap();
        db.mutate_user_saved("u1", a.id, true).unwrap();
        db.mutate_user_saved("u1", b.id, true).unwrap();
        assert_eq!(db.get_user("u1").unwrap().saved, vec![b.id, a.id]);

        let saved = db.get_saved_threads("u1").unwrap();
        let contents: Vec<_> = saved.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "a"]);
        assert_eq!(saved[0].author.username, "alice");

        db.mutate_user_saved("u1", b.id, false).unwrap();
        db.mutate_user_saved("u1", b.id, false).unwrap();
        assert_eq!(db.get_user("u1").unwrap().saved, vec![a.id]);
        assert_eq!(db.saved_thread_ids("u1").unwrap(), vec![a.id]);
        assert!(db.saved_thread_ids("nobody").unwrap().is_empty());
    }

    #[test]
    fn empty_saved_list_is_not_an_error() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        assert!(db.get_saved_threads("u1").unwrap().is_empty());
        assert!(matches!(
            db.get_saved_threads("ghost"),
            Err(StoreError::NotFound { kind: EntityKind::User, .. })
        ));
    }

    #[test]
    fn follow_updates_both_sides() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "a", "alice");
        user(&db, "b", "bob");

        db.mutate_follow("a", "b", true).unwrap();
        db.mutate_follow("a", "b", true).unwrap();
        let (alice, bob) = (db.get_user("a").unwrap(), db.get_user("b").unwrap());
        assert_eq!(alice.following, vec!["b"]);
        assert_eq!(bob.followers, vec!["a"]);
        assert!(alice.followers.is_empty());
        assert!(alice.is_following("b"));

        db.mutate_follow("a", "b", false).unwrap();
        let (alice, bob) = (db.get_user("a").unwrap(), db.get_user("b").unwrap());
        assert!(alice.following.is_empty());
        assert!(bob.followers.is_empty());
    }

    #[test]
    fn follow_requires_two_distinct_users() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "a", "alice");

        assert!(matches!(
            db.mutate_follow("a", "ghost", true),
            Err(StoreError::NotFound { kind: EntityKind::User, .. })
        ));
        assert!(matches!(
            db.mutate_follow("a", "a", true),
            Err(StoreError::Conflict(_))
        ));
        assert!(db.get_user("a").unwrap().following.is_empty());
    }

    #[test]
    fn flip_inverts_membership() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "u1", "alice");
        let t1 = thread(&db, "u1", "hello");
        let like = Engagement::Like {
            thread_id: t1.id,
            user_id: "u2",
        };

        assert_eq!(db.flip_engagement(like).unwrap(), Toggled { member: true, count: 1 });
        assert_eq!(db.get_thread(t1.id).unwrap().likes, vec!["u2".to_string()]);
        assert_eq!(db.flip_engagement(like).unwrap(), Toggled { member: false, count: 0 });
        assert!(db.get_thread(t1.id).unwrap().likes.is_empty());
    }

    #[test]
    fn outcome_counts_the_touched_set() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "a", "alice");
        user(&db, "b", "bob");
        user(&db, "c", "carol");
        let t1 = thread(&db, "a", "hello");

        let save = Engagement::Save {
            user_id: "b",
            thread_id: t1.id,
        };
        assert_eq!(db.set_engagement(save, true).unwrap(), Toggled { member: true, count: 1 });

        db.mutate_follow("b", "a", true).unwrap();
        let follow = Engagement::Follow {
            follower_id: "c",
            followee_id: "a",
        };
        assert_eq!(db.set_engagement(follow, true).unwrap(), Toggled { member: true, count: 2 });
    }

    #[test]
    fn concurrent_likes_report_a_consistent_count() {
        use std::sync::Arc;

        let db = Arc::new(Database::open_in_memory().unwrap());
        user(&db, "u1", "alice");
        let t1 = thread(&db, "u1", "hello");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let liker = format!("liker-{}", i);
                    let like = Engagement::Like {
                        thread_id: t1.id,
                        user_id: &liker,
                    };
                    db.set_engagement(like, true).unwrap().count
                })
            })
            .collect();
        let mut counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        counts.sort_unstable();

        // Each writer sees the set exactly as its own insert left it
        assert_eq!(counts, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn concurrent_adds_never_duplicate() {
        use std::sync::Arc;

        let db = Arc::new(Database::open_in_memory().unwrap());
        user(&db, "u1", "alice");
        let t1 = thread(&db, "u1", "hello");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    // Half the threads add, half flip-flop, all on the same pair
                    db.mutate_thread_likes(t1.id, "u2", true).unwrap();
                    if i % 2 == 0 {
                        db.mutate_thread_likes(t1.id, "u2", false).unwrap();
                        db.mutate_thread_likes(t1.id, "u2", true).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.get_thread(t1.id).unwrap().likes, vec!["u2"]);
    }
}
