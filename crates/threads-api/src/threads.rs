use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use threads_types::api::{
    Claims, CreateThreadRequest, DeleteThreadQuery, DeleteThreadResponse, LikeRequest,
    LikeResponse, SaveRequest, SaveResponse, ThreadView,
};
use threads_types::events::RealtimeEvent;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn create_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = claims.sub.clone();
    let CreateThreadRequest {
        content,
        parent_id,
        community_id,
        path,
    } = req;
    let thread = blocking(&state, move |svc| {
        svc.create_thread(&content, &author_id, parent_id, community_id)
    })
    .await?;

    state.notifier.publish(RealtimeEvent::ThreadCreated {
        thread_id: thread.id,
        author_id: thread.author.id.clone(),
        parent_id: thread.parent_id,
    });
    state.notifier.revalidate(path);

    // Nobody can have saved a thread that did not exist yet
    Ok((
        StatusCode::CREATED,
        Json(ThreadView::for_viewer(thread, &claims.sub, &[])),
    ))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ThreadView>, ApiError> {
    let viewer = claims.sub;
    let view = blocking(&state, move |svc| svc.fetch_thread(thread_id, &viewer)).await?;
    Ok(Json(view))
}

pub async fn get_replies(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ThreadView>>, ApiError> {
    let viewer = claims.sub;
    let replies = blocking(&state, move |svc| svc.fetch_replies(thread_id, &viewer)).await?;
    Ok(Json(replies))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<DeleteThreadQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteThreadResponse>, ApiError> {
    let actor_id = claims.sub.clone();
    let deleted = blocking(&state, move |svc| svc.delete_thread(thread_id, &actor_id)).await?;

    info!("{} deleted thread {} ({} total)", claims.sub, thread_id, deleted.len());
    state.notifier.publish(RealtimeEvent::ThreadDeleted {
        deleted: deleted.clone(),
    });
    state.notifier.revalidate(query.path);

    Ok(Json(DeleteThreadResponse { deleted }))
}

pub async fn like_unlike(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeResponse>, ApiError> {
    let user_id = claims.sub.clone();
    let previously = req.previously_liked;
    let outcome =
        blocking(&state, move |svc| svc.like_unlike(previously, thread_id, &user_id)).await?;

    state.notifier.publish(RealtimeEvent::LikeChanged {
        thread_id,
        user_id: claims.sub,
        liked: outcome.liked,
        likes_count: outcome.likes_count,
    });
    state.notifier.revalidate(req.path);

    Ok(Json(outcome))
}

pub async fn save_unsave(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let user_id = claims.sub.clone();
    let previously = req.previously_saved;
    let saved =
        blocking(&state, move |svc| svc.save_unsave(previously, thread_id, &user_id)).await?;

    state.notifier.publish(RealtimeEvent::SaveChanged {
        thread_id,
        user_id: claims.sub,
        saved,
    });
    state.notifier.revalidate(req.path);

    Ok(Json(SaveResponse { saved }))
}
