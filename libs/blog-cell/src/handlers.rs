use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::error::BlogError;
use crate::models::{
    ApprovalRequest, BlogCategory, BlogListQuery, BlogPostView, BlogStatus, CommentRequest, CreateBlogRequest,
    MyPostsQuery, PendingQuery, UpdateBlogRequest,
};
use crate::services::recommender::DEFAULT_RECOMMENDATIONS;
use crate::services::{BlogService, EngagementService, ModerationService, RecommendationService};

fn require_therapist(user: &User) -> Result<(), AppError> {
    require_role(user, Role::Therapist).map_err(|_| BlogError::NotATherapist.into())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Value>, AppError> {
    let blog_service = BlogService::new(&state);

    let page = blog_service.list_published(&query).await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_post(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    let blog_service = BlogService::new(&state);

    let detail = blog_service.read_published(&slug).await?;

    Ok(Json(json!(detail)))
}

pub async fn list_categories() -> Json<Value> {
    let categories: Vec<Value> = BlogCategory::ALL
        .iter()
        .map(|c| json!({ "value": c.as_str(), "label": c.label() }))
        .collect();

    Json(json!({ "categories": categories }))
}

// ==============================================================================
// AUTHORING
// ==============================================================================

#[axum::debug_handler]
pub async fn create_post(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlogRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_therapist(&user)?;
    let blog_service = BlogService::new(&state);

    let created = blog_service.create_post(&user, request, auth.token()).await?;

    let message = if created.is_verified {
        "Blog post published successfully!"
    } else {
        "Blog post submitted for approval. It will be reviewed by verified therapists or admins."
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": message,
            "blog": BlogPostView::from(created.post),
            "is_verified": created.is_verified
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_my_posts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<MyPostsQuery>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;
    let blog_service = BlogService::new(&state);

    let page = blog_service.my_posts(&user, &query, auth.token()).await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn update_post(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateBlogRequest>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;
    let blog_service = BlogService::new(&state);

    let post = blog_service.update_post(&user, &slug, request, auth.token()).await?;

    Ok(Json(json!({
        "message": "Blog post updated successfully",
        "blog": BlogPostView::from(post)
    })))
}

#[axum::debug_handler]
pub async fn delete_post(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;
    let blog_service = BlogService::new(&state);

    blog_service.delete_post(&user, &slug, auth.token()).await?;

    Ok(Json(json!({ "message": "Blog post deleted successfully" })))
}

#[axum::debug_handler]
pub async fn get_my_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;
    let blog_service = BlogService::new(&state);

    let stats = blog_service.author_stats(&user, auth.token()).await?;

    Ok(Json(json!(stats)))
}

// ==============================================================================
// MODERATION
// ==============================================================================

#[axum::debug_handler]
pub async fn list_pending_posts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Value>, AppError> {
    let moderation = ModerationService::new(&state);

    let page = moderation.pending_posts(&user, &query, auth.token()).await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn review_post(
    State(state): State<Arc<AppConfig>>,
    Path(post_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Json<Value>, AppError> {
    let moderation = ModerationService::new(&state);

    let post = moderation.review(&user, post_id, request, auth.token()).await?;

    let message = match post.status {
        BlogStatus::Rejected => "Blog post rejected",
        _ => "Blog post approved and published successfully",
    };

    Ok(Json(json!({
        "message": message,
        "blog": BlogPostView::from(post)
    })))
}

// ==============================================================================
// ENGAGEMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn toggle_like(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let engagement = EngagementService::new(&state);

    let like = engagement.toggle_like(&user, &slug, auth.token()).await?;

    Ok(Json(json!({
        "message": if like.is_liked { "Blog post liked" } else { "Blog post unliked" },
        "is_liked": like.is_liked,
        "likes_count": like.likes_count
    })))
}

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let engagement = EngagementService::new(&state);

    let comment = engagement.add_comment(&user, &slug, request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "comment": comment
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_recommendations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let recommender = RecommendationService::new(&state);

    let recommendations = recommender
        .recommend(user.id, DEFAULT_RECOMMENDATIONS, auth.token())
        .await?;

    Ok(Json(json!(recommendations)))
}
