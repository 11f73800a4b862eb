use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{Role, User};
use shared_models::pagination::{Page, PageRequest};
use therapist_cell::services::DirectoryService;

use crate::error::BlogError;
use crate::models::{ApprovalAction, ApprovalRequest, BlogPost, BlogPostView, BlogStatus, PendingQuery};
use crate::services::validation::validate_approval;

/// Review queue for posts submitted by unverified therapists.
pub struct ModerationService {
    supabase: SupabaseClient,
    directory: DirectoryService,
}

impl ModerationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
        }
    }

    /// Admins always moderate; therapists only once verified.
    pub async fn ensure_moderator(&self, user: &User, auth_token: &str) -> Result<(), BlogError> {
        match user.role {
            Some(Role::Admin) => Ok(()),
            Some(Role::Therapist) => {
                let profile = self.directory.get_profile(user.id, auth_token).await?;
                if profile.is_some_and(|p| p.is_verified) {
                    Ok(())
                } else {
                    Err(BlogError::NotAModerator)
                }
            }
            _ => Err(BlogError::NotAModerator),
        }
    }

    pub async fn pending_posts(
        &self,
        moderator: &User,
        query: &PendingQuery,
        auth_token: &str,
    ) -> Result<Page<BlogPostView>, BlogError> {
        self.ensure_moderator(moderator, auth_token).await?;

        let page = PageRequest { page: query.page, page_size: query.page_size };
        let path = format!(
            "/rest/v1/blog_posts?status=eq.pending&order=created_at.desc&{}",
            page.to_query()
        );
        let rows: Vec<BlogPost> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        let page = Page::from_overfetch(rows, &page);
        Ok(Page {
            results: page.results.into_iter().map(BlogPostView::from).collect(),
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
        })
    }

    /// Approve or reject a pending post. The status filter on the PATCH makes
    /// a second moderator's decision a no-op that reports `NotPending`.
    pub async fn review(
        &self,
        moderator: &User,
        post_id: Uuid,
        request: ApprovalRequest,
        auth_token: &str,
    ) -> Result<BlogPost, BlogError> {
        self.ensure_moderator(moderator, auth_token).await?;
        let rejection_reason = validate_approval(&request)?;

        let now = Utc::now();
        let body = match request.action {
            ApprovalAction::Approve => json!({
                "status": BlogStatus::Published,
                "approved_by": moderator.id,
                "approved_at": now,
                "published_at": now,
                "rejection_reason": null,
                "updated_at": now
            }),
            ApprovalAction::Reject => json!({
                "status": BlogStatus::Rejected,
                "rejection_reason": rejection_reason,
                "updated_at": now
            }),
        };

        let path = format!("/rest/v1/blog_posts?id=eq.{}&status=eq.pending", post_id);
        let updated: Vec<BlogPost> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let post = updated.into_iter().next().ok_or(BlogError::NotPending)?;
        info!("Blog post {} {} by {}", post.id, post.status, moderator.id);
        Ok(post)
    }
}
