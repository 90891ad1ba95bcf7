use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use threads_db::{Engagement, Store};
use threads_types::api::{
    CreateCommunityRequest, LikeResponse, ThreadView, UpdateProfileRequest, validate_content,
};
use threads_types::models::{Community, DeletePolicy, Thread, User};

use crate::error::ApiError;
use crate::toggle::ToggleMode;

/// Engagement operations over the store. Holds no state of its own between
/// calls: every operation acquires the database, does one unit of work and
/// returns. Store errors pass through untouched and nothing is retried.
pub struct EngagementService {
    store: Arc<Store>,
    toggle: Box<dyn ToggleMode>,
    delete_policy: DeletePolicy,
}

impl EngagementService {
    pub fn new(store: Arc<Store>, toggle: Box<dyn ToggleMode>, delete_policy: DeletePolicy) -> Self {
        info!(
            "Engagement service using {:?} toggles, {:?} deletes",
            toggle.kind(),
            delete_policy
        );
        Self {
            store,
            toggle,
            delete_policy,
        }
    }

    // -- Toggles --

    pub fn like_unlike(
        &self,
        previously_liked: bool,
        thread_id: Uuid,
        user_id: &str,
    ) -> Result<LikeResponse, ApiError> {
        let db = self.store.acquire()?;
        let outcome = self
            .toggle
            .toggle(&db, Engagement::Like { thread_id, user_id }, previously_liked)?;
        let liked = outcome.member;

        debug!("{} {} thread {}", user_id, if liked { "liked" } else { "unliked" }, thread_id);
        Ok(LikeResponse {
            liked,
            likes_count: outcome.count,
        })
    }

    pub fn save_unsave(
        &self,
        previously_saved: bool,
        thread_id: Uuid,
        user_id: &str,
    ) -> Result<bool, ApiError> {
        let db = self.store.acquire()?;
        let saved = self
            .toggle
            .toggle(&db, Engagement::Save { user_id, thread_id }, previously_saved)?
            .member;

        debug!("{} {} thread {}", user_id, if saved { "saved" } else { "unsaved" }, thread_id);
        Ok(saved)
    }

    pub fn follow_unfollow(
        &self,
        previously_following: bool,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, ApiError> {
        if follower_id == followee_id {
            return Err(ApiError::BadRequest("users cannot follow themselves".into()));
        }

        let db = self.store.acquire()?;
        let following = self
            .toggle
            .toggle(
                &db,
                Engagement::Follow {
                    follower_id,
                    followee_id,
                },
                previously_following,
            )?
            .member;

        debug!(
            "{} {} {}",
            follower_id,
            if following { "followed" } else { "unfollowed" },
            followee_id
        );
        Ok(following)
    }

    // -- Reads --

    pub fn fetch_user(&self, id: &str) -> Result<User, ApiError> {
        Ok(self.store.acquire()?.get_user(id)?)
    }

    pub fn fetch_saved_threads(&self, user_id: &str) -> Result<Vec<Thread>, ApiError> {
        Ok(self.store.acquire()?.get_saved_threads(user_id)?)
    }

    /// The thread with `viewer`'s like and save state.
    pub fn fetch_thread(&self, id: Uuid, viewer: &str) -> Result<ThreadView, ApiError> {
        let db = self.store.acquire()?;
        let thread = db.get_thread(id)?;
        let saves = db.saved_thread_ids(viewer)?;
        Ok(ThreadView::for_viewer(thread, viewer, &saves))
    }

    pub fn fetch_replies(&self, id: Uuid, viewer: &str) -> Result<Vec<ThreadView>, ApiError> {
        let db = self.store.acquire()?;
        let replies = db.get_replies(id)?;
        let saves = db.saved_thread_ids(viewer)?;
        Ok(replies
            .into_iter()
            .map(|reply| ThreadView::for_viewer(reply, viewer, &saves))
            .collect())
    }

    pub fn fetch_community(&self, id: Uuid) -> Result<Community, ApiError> {
        Ok(self.store.acquire()?.get_community(id)?)
    }

    // -- Writes --

    /// Validated profile upsert keyed by the identity provider's id.
    pub fn update_user(&self, id: &str, req: &UpdateProfileRequest) -> Result<User, ApiError> {
        req.validate().map_err(ApiError::BadRequest)?;

        let user = self.store.acquire()?.upsert_user(id, &req.to_fields())?;
        info!("Profile of {} saved as @{}", id, user.username);
        Ok(user)
    }

    pub fn create_thread(
        &self,
        content: &str,
        author_id: &str,
        parent_id: Option<Uuid>,
        community_id: Option<Uuid>,
    ) -> Result<Thread, ApiError> {
        validate_content(content).map_err(ApiError::BadRequest)?;

        let thread = self
            .store
            .acquire()?
            .create_thread(content, author_id, parent_id, community_id)?;
        if thread.is_reply() {
            debug!("{} replied to {:?} with {}", author_id, thread.parent_id, thread.id);
        } else {
            debug!("{} posted {}", author_id, thread.id);
        }
        Ok(thread)
    }

    /// Only the author may delete a thread. Replies are handled by the
    /// configured delete policy.
    pub fn delete_thread(&self, id: Uuid, actor_id: &str) -> Result<Vec<Uuid>, ApiError> {
        let db = self.store.acquire()?;

        let thread = db.get_thread(id)?;
        if thread.author.id != actor_id {
            return Err(ApiError::Forbidden(format!(
                "thread {} belongs to another user",
                id
            )));
        }

        Ok(db.delete_thread(id, self.delete_policy)?)
    }

    /// The creator becomes the first member.
    pub fn create_community(
        &self,
        req: &CreateCommunityRequest,
        creator_id: &str,
    ) -> Result<Community, ApiError> {
        req.validate().map_err(ApiError::BadRequest)?;

        let community = self.store.acquire()?.create_community(
            req.name.trim(),
            req.image.as_deref(),
            creator_id,
        )?;
        info!("Community {} ({}) created", community.name, community.id);
        Ok(community)
    }

    pub fn join_community(&self, community_id: Uuid, user_id: &str) -> Result<Community, ApiError> {
        Ok(self
            .store
            .acquire()?
            .add_community_member(community_id, user_id)?)
    }
}
