use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                username    TEXT NOT NULL UNIQUE,
                image       TEXT,
                bio         TEXT,
                onboarded   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE communities (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                image       TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE community_members (
                community_id    TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (community_id, user_id)
            );

            CREATE INDEX idx_community_members_user
                ON community_members(user_id);

            CREATE TABLE threads (
                id              TEXT PRIMARY KEY,
                content         TEXT NOT NULL,
                author_id       TEXT NOT NULL REFERENCES users(id),
                parent_id       TEXT REFERENCES threads(id),
                community_id    TEXT REFERENCES communities(id),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_threads_parent
                ON threads(parent_id, created_at);

            CREATE INDEX idx_threads_author
                ON threads(author_id, created_at);

            -- Like ids are opaque actor ids, not foreign keys.
            CREATE TABLE thread_likes (
                thread_id   TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (thread_id, user_id)
            );

            CREATE TABLE saved_threads (
                user_id     TEXT NOT NULL REFERENCES users(id),
                thread_id   TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, thread_id)
            );

            -- One row per relationship: following(A) and followers(B) are two
            -- views of the same row.
            CREATE TABLE follows (
                follower_id     TEXT NOT NULL REFERENCES users(id),
                followee_id     TEXT NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee
                ON follows(followee_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
