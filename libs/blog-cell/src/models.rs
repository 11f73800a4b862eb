use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WORDS_PER_MINUTE: usize = 200;

// ==============================================================================
// POSTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
    Published,
}

impl BlogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Pending => "pending",
            BlogStatus::Approved => "approved",
            BlogStatus::Rejected => "rejected",
            BlogStatus::Published => "published",
        }
    }
}

impl fmt::Display for BlogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogCategory {
    #[default]
    MentalHealth,
    Anxiety,
    Depression,
    Stress,
    Relationships,
    SelfCare,
    Therapy,
    Wellness,
    Other,
}

impl BlogCategory {
    pub const ALL: [BlogCategory; 9] = [
        BlogCategory::MentalHealth,
        BlogCategory::Anxiety,
        BlogCategory::Depression,
        BlogCategory::Stress,
        BlogCategory::Relationships,
        BlogCategory::SelfCare,
        BlogCategory::Therapy,
        BlogCategory::Wellness,
        BlogCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlogCategory::MentalHealth => "mental_health",
            BlogCategory::Anxiety => "anxiety",
            BlogCategory::Depression => "depression",
            BlogCategory::Stress => "stress",
            BlogCategory::Relationships => "relationships",
            BlogCategory::SelfCare => "self_care",
            BlogCategory::Therapy => "therapy",
            BlogCategory::Wellness => "wellness",
            BlogCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlogCategory::MentalHealth => "Mental Health",
            BlogCategory::Anxiety => "Anxiety",
            BlogCategory::Depression => "Depression",
            BlogCategory::Stress => "Stress Management",
            BlogCategory::Relationships => "Relationships",
            BlogCategory::SelfCare => "Self Care",
            BlogCategory::Therapy => "Therapy & Counseling",
            BlogCategory::Wellness => "Wellness",
            BlogCategory::Other => "Other",
        }
    }
}

impl fmt::Display for BlogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogAuthor {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub is_verified: bool,
}

/// Row of `blog_posts`, or of the `published_blog_posts` view which adds
/// the author as an embedded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub slug: String,
    pub author_id: Uuid,
    #[serde(default)]
    pub author: Option<BlogAuthor>,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub category: BlogCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub status: BlogStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    /// Minutes at 200 words per minute, never less than one.
    pub fn reading_time(&self) -> usize {
        (self.content.split_whitespace().count() / WORDS_PER_MINUTE).max(1)
    }

    /// Published after review; the author can no longer edit it in place.
    pub fn is_locked(&self) -> bool {
        self.status == BlogStatus::Published && self.approved_by.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogPostView {
    #[serde(flatten)]
    pub post: BlogPost,
    pub reading_time: usize,
}

impl From<BlogPost> for BlogPostView {
    fn from(post: BlogPost) -> Self {
        let reading_time = post.reading_time();
        Self { post, reading_time }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogPostDetail {
    #[serde(flatten)]
    pub post: BlogPostView,
    pub comments: Vec<BlogComment>,
    pub comments_count: usize,
}

// ==============================================================================
// ENGAGEMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogComment {
    pub id: Uuid,
    pub blog_post_id: Uuid,
    pub author_id: Uuid,
    #[serde(default)]
    pub author: Option<BlogAuthor>,
    pub content: String,
    #[serde(default = "default_true")]
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

/// Narrow row used for author statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct PostCounters {
    pub id: Uuid,
    pub status: BlogStatus,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlogStats {
    pub total_posts: usize,
    pub published_posts: usize,
    pub pending_posts: usize,
    pub draft_posts: usize,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Personalized,
    Trending,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub blog: BlogPostView,
    pub reason: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category: Option<BlogCategory>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<BlogCategory>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub meta_description: Option<String>,
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub action: ApprovalAction,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum BlogOrdering {
    #[serde(rename = "published_at")]
    PublishedAtAsc,
    #[default]
    #[serde(rename = "-published_at")]
    PublishedAtDesc,
    #[serde(rename = "created_at")]
    CreatedAtAsc,
    #[serde(rename = "-created_at")]
    CreatedAtDesc,
    #[serde(rename = "views_count")]
    ViewsAsc,
    #[serde(rename = "-views_count")]
    ViewsDesc,
    #[serde(rename = "likes_count")]
    LikesAsc,
    #[serde(rename = "-likes_count")]
    LikesDesc,
}

impl BlogOrdering {
    pub fn order_param(&self) -> &'static str {
        match self {
            BlogOrdering::PublishedAtAsc => "published_at.asc.nullslast",
            BlogOrdering::PublishedAtDesc => "published_at.desc.nullslast",
            BlogOrdering::CreatedAtAsc => "created_at.asc",
            BlogOrdering::CreatedAtDesc => "created_at.desc",
            BlogOrdering::ViewsAsc => "views_count.asc",
            BlogOrdering::ViewsDesc => "views_count.desc",
            BlogOrdering::LikesAsc => "likes_count.asc",
            BlogOrdering::LikesDesc => "likes_count.desc",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub category: Option<BlogCategory>,
    /// Comma-separated; a post must carry every tag.
    pub tags: Option<String>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<BlogOrdering>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyPostsQuery {
    pub status: Option<BlogStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
