/// Database row types: these map directly to SQLite rows.
/// Nothing leaves the crate in this shape: `decode` turns rows into the
/// typed records of threads-types.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
    pub created_at: String,
}

pub struct AuthorRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
}

pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub created_at: String,
}

/// A thread joined with its author and, when present, its community.
pub struct ThreadRow {
    pub id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub author: AuthorRow,
    pub community_id: Option<String>,
    pub community_name: Option<String>,
    pub community_image: Option<String>,
}

pub struct ReplyRow {
    pub id: String,
    pub created_at: String,
    pub author: AuthorRow,
}

pub struct ThreadSummaryRow {
    pub id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub community_id: Option<String>,
    pub created_at: String,
}
