use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn survey_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/surveys/start/", post(handlers::start_survey))
        .route("/surveys/history/", get(handlers::survey_history))
        .route("/surveys/detail/{survey_id}/", get(handlers::survey_detail))
        .route("/surveys/questions/static/", get(handlers::get_static_questions))
        .route("/surveys/responses/static/", post(handlers::submit_static_responses))
        .route("/surveys/questions/dynamic/", post(handlers::get_dynamic_question))
        .route("/surveys/responses/dynamic/", post(handlers::submit_dynamic_answer))
        .route("/surveys/complete/", post(handlers::complete_survey))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
