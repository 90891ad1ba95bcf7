use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use threads_types::api::{Claims, CreateCommunityRequest};
use threads_types::models::Community;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn create_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let creator = claims.sub;
    let community = blocking(&state, move |svc| svc.create_community(&req, &creator)).await?;

    Ok((StatusCode::CREATED, Json(community)))
}

pub async fn get_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Community>, ApiError> {
    let community = blocking(&state, move |svc| svc.fetch_community(community_id)).await?;
    Ok(Json(community))
}

pub async fn join_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Community>, ApiError> {
    let user_id = claims.sub;
    let community =
        blocking(&state, move |svc| svc.join_community(community_id, &user_id)).await?;
    Ok(Json(community))
}
