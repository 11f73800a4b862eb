use reqwest::Url;
use serde_json::{json, Map, Value};

use crate::error::BlogError;
use crate::models::{ApprovalAction, ApprovalRequest, BlogStatus, CreateBlogRequest, UpdateBlogRequest};

pub const MIN_TITLE_CHARS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 255;
pub const MIN_CONTENT_CHARS: usize = 100;
pub const MIN_EXCERPT_CHARS: usize = 50;
pub const MAX_EXCERPT_CHARS: usize = 500;
pub const MAX_META_CHARS: usize = 160;
pub const MIN_COMMENT_CHARS: usize = 3;
pub const MAX_COMMENT_CHARS: usize = 1000;

fn chars(value: &str) -> usize {
    value.chars().count()
}

pub fn validate_title(title: &str) -> Result<String, BlogError> {
    let title = title.trim();
    if chars(title) < MIN_TITLE_CHARS {
        return Err(BlogError::invalid("title", "Title must be at least 10 characters long"));
    }
    if chars(title) > MAX_TITLE_CHARS {
        return Err(BlogError::invalid("title", "Title must be at most 255 characters long"));
    }
    Ok(title.to_string())
}

pub fn validate_content(content: &str) -> Result<String, BlogError> {
    if chars(content.trim()) < MIN_CONTENT_CHARS {
        return Err(BlogError::invalid("content", "Content must be at least 100 characters long"));
    }
    Ok(content.to_string())
}

pub fn validate_excerpt(excerpt: &str) -> Result<String, BlogError> {
    let excerpt = excerpt.trim();
    if chars(excerpt) < MIN_EXCERPT_CHARS {
        return Err(BlogError::invalid("excerpt", "Excerpt must be at least 50 characters long"));
    }
    if chars(excerpt) > MAX_EXCERPT_CHARS {
        return Err(BlogError::invalid("excerpt", "Excerpt must be at most 500 characters long"));
    }
    Ok(excerpt.to_string())
}

pub fn validate_meta_description(meta: &str) -> Result<String, BlogError> {
    let meta = meta.trim();
    if chars(meta) > MAX_META_CHARS {
        return Err(BlogError::invalid(
            "meta_description",
            "Meta description must be at most 160 characters long",
        ));
    }
    Ok(meta.to_string())
}

/// Blank clears the image; anything else must be an absolute http(s) URL.
pub fn validate_cover_image(url: &str) -> Result<Option<String>, BlogError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(Some(url.to_string()))
        }
        _ => Err(BlogError::invalid("cover_image", "Enter a valid URL.")),
    }
}

pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
        if !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

/// Validated insert columns for a new post, without author, slug or status.
pub fn new_post_fields(request: &CreateBlogRequest) -> Result<Map<String, Value>, BlogError> {
    let mut fields = Map::new();
    fields.insert("title".into(), json!(validate_title(&request.title)?));
    fields.insert("content".into(), json!(validate_content(&request.content)?));
    fields.insert("excerpt".into(), json!(validate_excerpt(&request.excerpt)?));
    fields.insert("category".into(), json!(request.category.unwrap_or_default()));
    fields.insert("tags".into(), json!(clean_tags(request.tags.as_deref().unwrap_or_default())));
    fields.insert(
        "cover_image".into(),
        json!(validate_cover_image(request.cover_image.as_deref().unwrap_or_default())?),
    );
    fields.insert(
        "meta_description".into(),
        json!(validate_meta_description(request.meta_description.as_deref().unwrap_or_default())?),
    );
    Ok(fields)
}

/// PATCH columns for an author edit. Authors may only move a post back to
/// `draft` or submit it as `pending`.
pub fn update_fields(request: &UpdateBlogRequest) -> Result<Map<String, Value>, BlogError> {
    let mut fields = Map::new();

    if let Some(title) = &request.title {
        fields.insert("title".into(), json!(validate_title(title)?));
    }
    if let Some(content) = &request.content {
        fields.insert("content".into(), json!(validate_content(content)?));
    }
    if let Some(excerpt) = &request.excerpt {
        fields.insert("excerpt".into(), json!(validate_excerpt(excerpt)?));
    }
    if let Some(category) = request.category {
        fields.insert("category".into(), json!(category));
    }
    if let Some(tags) = &request.tags {
        fields.insert("tags".into(), json!(clean_tags(tags)));
    }
    if let Some(cover_image) = &request.cover_image {
        fields.insert("cover_image".into(), json!(validate_cover_image(cover_image)?));
    }
    if let Some(meta) = &request.meta_description {
        fields.insert("meta_description".into(), json!(validate_meta_description(meta)?));
    }
    if let Some(status) = request.status {
        if !matches!(status, BlogStatus::Draft | BlogStatus::Pending) {
            return Err(BlogError::invalid("status", "Can only update status to: draft, pending"));
        }
        fields.insert("status".into(), json!(status));
        fields.insert("published_at".into(), Value::Null);
    }

    Ok(fields)
}

/// Rejections must say why.
pub fn validate_approval(request: &ApprovalRequest) -> Result<Option<String>, BlogError> {
    let reason = request
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    match request.action {
        ApprovalAction::Approve => Ok(None),
        ApprovalAction::Reject => reason.map(Some).ok_or_else(|| {
            BlogError::invalid("rejection_reason", "Rejection reason is required when rejecting a blog")
        }),
    }
}

pub fn validate_comment(content: &str) -> Result<String, BlogError> {
    let content = content.trim();
    if chars(content) < MIN_COMMENT_CHARS {
        return Err(BlogError::invalid("content", "Comment must be at least 3 characters long"));
    }
    if chars(content) > MAX_COMMENT_CHARS {
        return Err(BlogError::invalid("content", "Comment cannot exceed 1000 characters"));
    }
    Ok(content.to_string())
}
