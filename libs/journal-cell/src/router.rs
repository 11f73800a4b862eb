use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn journal_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/journal/entries/",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/journal/entries/{entry_id}/",
            get(handlers::get_entry)
                .patch(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route("/journal/analytics/mood/", get(handlers::get_mood_distribution))
        .route("/journal/analytics/trend/", get(handlers::get_mood_trend))
        .route("/journal/analytics/summary/", get(handlers::get_summary))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
