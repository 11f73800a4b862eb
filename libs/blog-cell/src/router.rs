use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn blog_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/blog/", get(handlers::list_posts))
        .route("/blog/categories/", get(handlers::list_categories))
        .route("/blog/posts/{slug}/", get(handlers::get_post));

    let protected_routes = Router::new()
        // Authors
        .route("/blog/my-posts/", get(handlers::list_my_posts).post(handlers::create_post))
        .route(
            "/blog/my-posts/{slug}/",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        .route("/blog/stats/me/", get(handlers::get_my_stats))

        // Moderators
        .route("/blog/pending/", get(handlers::list_pending_posts))
        .route("/blog/pending/{post_id}/review/", post(handlers::review_post))

        // Readers
        .route("/blog/posts/{slug}/like/", post(handlers::toggle_like))
        .route("/blog/posts/{slug}/comments/", post(handlers::add_comment))
        .route("/blog/recommendations/", get(handlers::get_recommendations))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
