use threads_types::models::{ProfileFields, Thread, User};

use crate::Database;

pub fn profile(name: &str, username: &str) -> ProfileFields {
    ProfileFields {
        name: name.into(),
        username: username.into(),
        ..Default::default()
    }
}

pub fn user(db: &Database, id: &str, username: &str) -> User {
    db.upsert_user(id, &profile(username, username)).unwrap()
}

pub fn thread(db: &Database, author_id: &str, content: &str) -> Thread {
    db.create_thread(content, author_id, None, None).unwrap()
}

pub fn reply(db: &Database, author_id: &str, parent: &Thread, content: &str) -> Thread {
    db.create_thread(content, author_id, Some(parent.id), None).unwrap()
}
