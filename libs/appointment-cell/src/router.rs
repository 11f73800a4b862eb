use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Patient
        .route("/appointments/create/", post(handlers::create_appointment))
        .route("/appointments/my/", get(handlers::list_my_appointments))
        .route("/appointments/stats/", get(handlers::get_appointment_stats))
        .route("/appointments/{appointment_id}/", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/history/", get(handlers::get_appointment_history))
        .route("/appointments/{appointment_id}/cancel/", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/feedback/", post(handlers::submit_feedback))

        // Therapist
        .route("/therapist/appointments/", get(handlers::list_therapist_appointments))
        .route(
            "/therapist/appointments/{appointment_id}/confirm/",
            post(handlers::confirm_appointment),
        )

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
