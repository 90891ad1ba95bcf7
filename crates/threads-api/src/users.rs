use axum::{
    Extension, Json,
    extract::{Path, State},
};

use threads_types::api::{Claims, FollowRequest, FollowResponse, ThreadView, UpdateProfileRequest};
use threads_types::events::RealtimeEvent;
use threads_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let user = blocking(&state, move |svc| svc.fetch_user(&user_id)).await?;
    Ok(Json(user))
}

/// PUT /users/me: onboarding and profile edits for the authenticated user.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user_id = claims.sub;
    let (user, path) = blocking(&state, move |svc| {
        let user = svc.update_user(&user_id, &req)?;
        Ok((user, req.path))
    })
    .await?;

    state.notifier.revalidate(path);
    Ok(Json(user))
}

/// GET /users/{id}/saved: saves are private, so only the owner may list them.
pub async fn get_saved(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ThreadView>>, ApiError> {
    if user_id != claims.sub {
        return Err(ApiError::Forbidden("saved threads are private".into()));
    }

    let threads = blocking(&state, move |svc| svc.fetch_saved_threads(&user_id)).await?;
    let saves: Vec<_> = threads.iter().map(|thread| thread.id).collect();
    let views = threads
        .into_iter()
        .map(|thread| ThreadView::for_viewer(thread, &claims.sub, &saves))
        .collect();
    Ok(Json(views))
}

/// POST /users/{id}/follow: the authenticated user follows or unfollows `id`.
pub async fn follow_unfollow(
    State(state): State<AppState>,
    Path(followee_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> Result<Json<FollowResponse>, ApiError> {
    let follower_id = claims.sub;
    let (fid, tid) = (follower_id.clone(), followee_id.clone());
    let previously = req.previously_following;
    let following =
        blocking(&state, move |svc| svc.follow_unfollow(previously, &fid, &tid)).await?;

    state.notifier.publish(RealtimeEvent::FollowChanged {
        follower_id,
        followee_id,
        following,
    });
    state.notifier.revalidate(req.path);

    Ok(Json(FollowResponse { following }))
}
