use std::sync::Arc;

use axum::{
    Router,
    routing::{get, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn therapist_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/therapists/", get(handlers::list_therapists));

    let protected_routes = Router::new()
        .route("/therapists/{therapist_id}/availability/", get(handlers::get_therapist_availability))
        .route("/therapists/{therapist_id}/slots/", get(handlers::get_available_slots))

        // Therapist self-service
        .route(
            "/therapist/availability/",
            get(handlers::get_my_availability).post(handlers::create_availability),
        )
        .route(
            "/therapist/time-off/",
            get(handlers::list_time_off).post(handlers::create_time_off),
        )
        .route("/therapist/time-off/{time_off_id}/", delete(handlers::delete_time_off))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
