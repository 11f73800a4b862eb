use std::collections::HashSet;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::User;
use shared_models::pagination::{Page, PageRequest};
use therapist_cell::services::DirectoryService;

use crate::error::BlogError;
use crate::models::{
    BlogComment, BlogListQuery, BlogPost, BlogPostDetail, BlogPostView, BlogStats, BlogStatus,
    CreateBlogRequest, MyPostsQuery, PostCounters, UpdateBlogRequest,
};
use crate::services::slug::{slugify, unique_slug};
use crate::services::validation::{new_post_fields, update_fields};

const SLUG_ATTEMPTS: usize = 3;
const UNIQUE_VIOLATION: &str = "23505";

/// Characters that would break out of a PostgREST `or=(...)` filter.
fn sanitize_search(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// PostgREST query string for the public listing.
pub fn build_list_query(query: &BlogListQuery) -> String {
    let mut params = vec!["select=*".to_string()];

    if let Some(category) = query.category {
        params.push(format!("category=eq.{}", category));
    }

    if let Some(tags) = query.tags.as_deref() {
        let tags: Vec<String> = tags
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t.replace('"', "")))
            .collect();
        if !tags.is_empty() {
            params.push(format!("tags=cs.{}", urlencoding::encode(&format!("{{{}}}", tags.join(",")))));
        }
    }

    if let Some(author) = query.author {
        params.push(format!("author_id=eq.{}", author));
    }

    if let Some(term) = query.search.as_deref().map(sanitize_search).filter(|t| !t.is_empty()) {
        let pattern = urlencoding::encode(&format!("*{}*", term)).into_owned();
        params.push(format!(
            "or=(title.ilike.{p},excerpt.ilike.{p},content.ilike.{p})",
            p = pattern
        ));
    }

    params.push(format!("order={}", query.ordering.unwrap_or_default().order_param()));

    let page = PageRequest { page: query.page, page_size: query.page_size };
    params.push(page.to_query());

    params.join("&")
}

pub fn compute_stats(posts: &[PostCounters], total_comments: usize) -> BlogStats {
    let count = |status: BlogStatus| posts.iter().filter(|p| p.status == status).count();

    BlogStats {
        total_posts: posts.len(),
        published_posts: count(BlogStatus::Published),
        pending_posts: count(BlogStatus::Pending),
        draft_posts: count(BlogStatus::Draft),
        total_views: posts.iter().map(|p| p.views_count).sum(),
        total_likes: posts.iter().map(|p| p.likes_count).sum(),
        total_comments,
    }
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    slug: String,
}

/// Outcome of a create: verified authors publish immediately.
#[derive(Debug, Clone)]
pub struct CreatedPost {
    pub post: BlogPost,
    pub is_verified: bool,
}

pub struct BlogService {
    supabase: SupabaseClient,
    directory: DirectoryService,
}

impl BlogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
        }
    }

    // ==========================================================================
    // PUBLIC READS
    // ==========================================================================

    pub async fn list_published(&self, query: &BlogListQuery) -> Result<Page<BlogPostView>, BlogError> {
        let path = format!("/rest/v1/published_blog_posts?{}", build_list_query(query));
        debug!("Listing blog posts: {}", path);

        let rows: Vec<BlogPost> = self.supabase.request(Method::GET, &path, None, None).await?;

        let page = PageRequest { page: query.page, page_size: query.page_size };
        let page = Page::from_overfetch(rows, &page);
        Ok(Page {
            results: page.results.into_iter().map(BlogPostView::from).collect(),
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
        })
    }

    pub async fn find_published(&self, slug: &str, auth_token: Option<&str>) -> Result<BlogPost, BlogError> {
        let path = format!("/rest/v1/published_blog_posts?slug=eq.{}", urlencoding::encode(slug));
        let rows: Vec<BlogPost> = self.supabase.request(Method::GET, &path, auth_token, None).await?;
        rows.into_iter().next().ok_or(BlogError::NotFound)
    }

    /// Reads a published post and records the view.
    pub async fn read_published(&self, slug: &str) -> Result<BlogPostDetail, BlogError> {
        let mut post = self.find_published(slug, None).await?;

        let comments_path = format!(
            "/rest/v1/blog_comment_feed?blog_post_id=eq.{}&order=created_at.desc",
            post.id
        );
        let (views_count, comments) = futures::try_join!(
            self.supabase.rpc::<i64>("record_blog_view", None, json!({ "p_post_id": post.id })),
            self.supabase.request::<Vec<BlogComment>>(Method::GET, &comments_path, None, None)
        )?;

        post.views_count = views_count;
        Ok(BlogPostDetail {
            post: BlogPostView::from(post),
            comments_count: comments.len(),
            comments,
        })
    }

    // ==========================================================================
    // AUTHORING
    // ==========================================================================

    async fn is_verified(&self, author: &User, auth_token: &str) -> Result<bool, BlogError> {
        let profile = self.directory.get_profile(author.id, auth_token).await?;
        Ok(profile.map(|p| p.is_verified).unwrap_or(false))
    }

    async fn taken_slugs(&self, base: &str, auth_token: &str) -> Result<HashSet<String>, BlogError> {
        let path = format!(
            "/rest/v1/blog_posts?slug=like.{}*&select=slug",
            urlencoding::encode(base)
        );
        let rows: Vec<SlugRow> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(rows.into_iter().map(|r| r.slug).collect())
    }

    pub async fn create_post(
        &self,
        author: &User,
        request: CreateBlogRequest,
        auth_token: &str,
    ) -> Result<CreatedPost, BlogError> {
        let mut fields = new_post_fields(&request)?;

        let is_verified = self.is_verified(author, auth_token).await?;
        let (status, published_at) = if is_verified {
            (BlogStatus::Published, Some(Utc::now()))
        } else {
            (BlogStatus::Pending, None)
        };
        fields.insert("author_id".into(), json!(author.id));
        fields.insert("status".into(), json!(status));
        fields.insert("published_at".into(), json!(published_at));

        let base = slugify(&request.title);
        let mut taken = self.taken_slugs(&base, auth_token).await?;

        for attempt in 0..SLUG_ATTEMPTS {
            let slug = unique_slug(&base, &taken);
            fields.insert("slug".into(), json!(slug));

            let result: Result<Vec<BlogPost>, SupabaseError> = self.supabase.request_with_headers(
                Method::POST,
                "/rest/v1/blog_posts",
                Some(auth_token),
                Some(Value::Object(fields.clone())),
                Some(SupabaseClient::representation_headers()),
            ).await;

            match result {
                Ok(created) => {
                    let post = created
                        .into_iter()
                        .next()
                        .ok_or_else(|| BlogError::Database("Failed to create blog post".to_string()))?;
                    info!("Blog post {} ({}) created by {} as {}", post.id, post.slug, author.id, post.status);
                    return Ok(CreatedPost { post, is_verified });
                }
                // Slugs of other authors' unpublished posts are not visible here.
                Err(SupabaseError::Conflict { ref code, .. }) if code == UNIQUE_VIOLATION => {
                    warn!("Slug {} already taken (attempt {})", slug, attempt + 1);
                    taken.insert(slug);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BlogError::Database("Could not allocate a unique slug".to_string()))
    }

    pub async fn my_posts(
        &self,
        author: &User,
        query: &MyPostsQuery,
        auth_token: &str,
    ) -> Result<Page<BlogPostView>, BlogError> {
        let page = PageRequest { page: query.page, page_size: query.page_size };

        let mut path = format!("/rest/v1/blog_posts?author_id=eq.{}", author.id);
        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str(&format!("&order=created_at.desc&{}", page.to_query()));

        let rows: Vec<BlogPost> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let page = Page::from_overfetch(rows, &page);
        Ok(Page {
            results: page.results.into_iter().map(BlogPostView::from).collect(),
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
        })
    }

    async fn own_post(&self, author: &User, slug: &str, auth_token: &str) -> Result<BlogPost, BlogError> {
        let path = format!(
            "/rest/v1/blog_posts?slug=eq.{}&author_id=eq.{}",
            urlencoding::encode(slug),
            author.id
        );
        let rows: Vec<BlogPost> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        rows.into_iter().next().ok_or(BlogError::NotAuthor)
    }

    pub async fn update_post(
        &self,
        author: &User,
        slug: &str,
        request: UpdateBlogRequest,
        auth_token: &str,
    ) -> Result<BlogPost, BlogError> {
        let post = self.own_post(author, slug, auth_token).await?;
        if post.is_locked() {
            return Err(BlogError::Locked);
        }

        let mut fields = update_fields(&request)?;
        if fields.is_empty() {
            return Ok(post);
        }
        fields.insert("updated_at".into(), json!(Utc::now()));

        let path = format!("/rest/v1/blog_posts?id=eq.{}&author_id=eq.{}", post.id, author.id);
        let updated: Vec<BlogPost> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(fields)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let updated = updated.into_iter().next().ok_or(BlogError::NotAuthor)?;
        info!("Blog post {} updated by {}", updated.id, author.id);
        Ok(updated)
    }

    pub async fn delete_post(&self, author: &User, slug: &str, auth_token: &str) -> Result<(), BlogError> {
        let path = format!(
            "/rest/v1/blog_posts?slug=eq.{}&author_id=eq.{}",
            urlencoding::encode(slug),
            author.id
        );
        let deleted: Vec<BlogPost> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if deleted.is_empty() {
            return Err(BlogError::NotAuthor);
        }
        info!("Blog post {} deleted by {}", slug, author.id);
        Ok(())
    }

    pub async fn author_stats(&self, author: &User, auth_token: &str) -> Result<BlogStats, BlogError> {
        let path = format!(
            "/rest/v1/blog_posts?author_id=eq.{}&select=id,status,views_count,likes_count",
            author.id
        );
        let posts: Vec<PostCounters> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        let total_comments = if posts.is_empty() {
            0
        } else {
            let ids = posts.iter().map(|p| p.id.to_string()).collect::<Vec<_>>().join(",");
            let path = format!("/rest/v1/blog_comments?blog_post_id=in.({})&select=id", ids);
            let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
            rows.len()
        };

        Ok(compute_stats(&posts, total_comments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlogCategory, BlogOrdering};

    #[test]
    fn list_query_combines_filters() {
        let query = BlogListQuery {
            category: Some(BlogCategory::SelfCare),
            tags: Some("Sleep, cbt ,".to_string()),
            search: Some("panic (attack)".to_string()),
            ordering: Some(BlogOrdering::LikesDesc),
            page: Some(2),
            ..Default::default()
        };

        let built = build_list_query(&query);
        assert!(built.contains("category=eq.self_care"));
        assert!(built.contains("tags=cs.%7B%22sleep%22%2C%22cbt%22%7D"));
        assert!(built.contains("or=(title.ilike.%2Apanic%20attack%2A,"));
        assert!(built.contains("order=likes_count.desc"));
        assert!(built.ends_with("limit=11&offset=10"));
    }

    #[test]
    fn default_listing_is_newest_first() {
        let built = build_list_query(&BlogListQuery::default());
        assert_eq!(built, "select=*&order=published_at.desc.nullslast&limit=11&offset=0");
    }

    #[test]
    fn stats_fold_counters() {
        let row = |status, views, likes| PostCounters { id: Uuid::new_v4(), status, views_count: views, likes_count: likes };
        let stats = compute_stats(
            &[
                row(BlogStatus::Published, 120, 9),
                row(BlogStatus::Published, 30, 1),
                row(BlogStatus::Pending, 0, 0),
                row(BlogStatus::Rejected, 4, 0),
            ],
            7,
        );

        assert_eq!(stats.total_posts, 4);
        assert_eq!((stats.published_posts, stats.pending_posts, stats.draft_posts), (2, 1, 0));
        assert_eq!((stats.total_views, stats.total_likes, stats.total_comments), (154, 10, 7));
    }
}
