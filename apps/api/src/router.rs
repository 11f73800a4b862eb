use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use blog_cell::router::blog_routes;
use chatbot_cell::router::chatbot_routes;
use journal_cell::router::journal_routes;
use shared_config::AppConfig;
use survey_cell::router::survey_routes;
use therapist_cell::router::therapist_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "MindCare API is running!" }))
        .merge(therapist_routes(state.clone()))
        .merge(appointment_routes(state.clone()))
        .merge(survey_routes(state.clone()))
        .merge(chatbot_routes(state.clone()))
        .merge(journal_routes(state.clone()))
        .merge(blog_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(TestConfig::default().to_arc())
    }

    #[tokio::test]
    async fn health_route_responds() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in [
            "/appointments/my/",
            "/surveys/history/",
            "/therapist/time-off/",
            "/journal/entries/",
            "/blog/my-posts/",
        ] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn blog_categories_are_public() {
        let response = app()
            .oneshot(Request::builder().uri("/blog/categories/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn crisis_check_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chatbot/check-crisis/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"I want to die"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
