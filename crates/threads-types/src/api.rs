use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ProfileFields, Thread, UserId};

pub const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
pub const MAX_BIO_LEN: usize = 1000;
pub const MAX_IMAGE_LEN: usize = 2048;
pub const MAX_THREAD_LEN: usize = 1000;

// -- JWT Claims --

/// Claims of a token minted by the identity provider. `sub` is the opaque
/// user id every engagement is attributed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub username: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    /// Page to revalidate once the profile is stored.
    pub path: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        let name_len = self.name.trim().chars().count();
        if !NAME_LEN.contains(&name_len) {
            return Err(format!(
                "name must be between {} and {} characters",
                NAME_LEN.start(),
                NAME_LEN.end()
            ));
        }

        let username = normalize_username(&self.username);
        if !USERNAME_LEN.contains(&username.chars().count()) {
            return Err(format!(
                "username must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
        {
            return Err("username may only contain letters, digits, '_' and '.'".into());
        }

        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(format!("bio must be at most {} characters", MAX_BIO_LEN));
            }
        }
        if let Some(image) = &self.image {
            if image.is_empty() || image.len() > MAX_IMAGE_LEN {
                return Err("image reference is empty or too long".into());
            }
        }

        Ok(())
    }

    /// Fields for the store. Submitting the profile form completes onboarding.
    pub fn to_fields(&self) -> ProfileFields {
        ProfileFields {
            name: self.name.trim().to_string(),
            username: normalize_username(&self.username),
            image: self.image.clone(),
            bio: self.bio.clone(),
            onboarded: true,
        }
    }
}

/// Usernames are stored lower-cased so uniqueness ignores case.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub previously_following: bool,
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
}

// -- Threads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThreadRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub community_id: Option<Uuid>,
    pub path: Option<String>,
}

pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("thread content must not be empty".into());
    }
    if content.chars().count() > MAX_THREAD_LEN {
        return Err(format!("thread content must be at most {} characters", MAX_THREAD_LEN));
    }
    Ok(())
}

/// A thread as seen by one viewer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub thread: Thread,
    pub likes_count: usize,
    pub liked: bool,
    /// Whether the viewer has this thread in their saved list. Clients send
    /// it back as `previously_saved`.
    pub saved: bool,
}

impl ThreadView {
    pub fn for_viewer(thread: Thread, viewer: &str, viewer_saves: &[Uuid]) -> Self {
        Self {
            likes_count: thread.likes_count(),
            liked: thread.is_liked_by(viewer),
            saved: viewer_saves.contains(&thread.id),
            thread,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeRequest {
    pub previously_liked: bool,
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveRequest {
    pub previously_saved: bool,
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteThreadQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteThreadResponse {
    pub deleted: Vec<Uuid>,
}

// -- Communities --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub image: Option<String>,
}

impl CreateCommunityRequest {
    pub fn validate(&self) -> Result<(), String> {
        let len = self.name.trim().chars().count();
        if !NAME_LEN.contains(&len) {
            return Err(format!(
                "community name must be between {} and {} characters",
                NAME_LEN.start(),
                NAME_LEN.end()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
