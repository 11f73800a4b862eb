use reqwest::Method;
use serde_json::json;
use tracing::info;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::error::BlogError;
use crate::models::{BlogComment, CommentRequest, LikeState};
use crate::services::posts::BlogService;
use crate::services::validation::validate_comment;

pub struct EngagementService {
    supabase: SupabaseClient,
    posts: BlogService,
}

impl EngagementService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            posts: BlogService::new(config),
        }
    }

    /// Likes an unliked post or unlikes a liked one, atomically in storage.
    pub async fn toggle_like(&self, user: &User, slug: &str, auth_token: &str) -> Result<LikeState, BlogError> {
        let post = self.posts.find_published(slug, Some(auth_token)).await?;

        let state: LikeState = self
            .supabase
            .rpc("toggle_blog_like", Some(auth_token), json!({ "p_post_id": post.id }))
            .await?;

        info!(
            "User {} {} post {} ({} likes)",
            user.id,
            if state.is_liked { "liked" } else { "unliked" },
            post.id,
            state.likes_count
        );
        Ok(state)
    }

    pub async fn add_comment(
        &self,
        user: &User,
        slug: &str,
        request: CommentRequest,
        auth_token: &str,
    ) -> Result<BlogComment, BlogError> {
        let content = validate_comment(&request.content)?;
        let post = self.posts.find_published(slug, Some(auth_token)).await?;

        let created: Vec<BlogComment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/blog_comments",
            Some(auth_token),
            Some(json!({
                "blog_post_id": post.id,
                "author_id": user.id,
                "content": content
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let comment = created
            .into_iter()
            .next()
            .ok_or_else(|| BlogError::Database("Failed to add comment".to_string()))?;

        info!("Comment {} added to post {} by {}", comment.id, post.id, user.id);
        Ok(comment)
    }
}
