use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{communities, events, threads, users};

/// All API routes. Every route requires a bearer token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/me", put(users::update_me))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/saved", get(users::get_saved))
        .route("/users/{user_id}/follow", post(users::follow_unfollow))
        .route("/threads", post(threads::create_thread))
        .route(
            "/threads/{thread_id}",
            get(threads::get_thread).delete(threads::delete_thread),
        )
        .route("/threads/{thread_id}/replies", get(threads::get_replies))
        .route("/threads/{thread_id}/like", post(threads::like_unlike))
        .route("/threads/{thread_id}/save", post(threads::save_unsave))
        .route("/communities", post(communities::create_community))
        .route("/communities/{community_id}", get(communities::get_community))
        .route(
            "/communities/{community_id}/members",
            post(communities::join_community),
        )
        .route("/events", get(events::subscribe))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
