use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;
use therapist_cell::models::TherapistError;

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("Blog post not found")]
    NotFound,

    #[error("Blog post not found or you do not have permission to edit it")]
    NotAuthor,

    #[error("Blog post not found or not in pending status")]
    NotPending,

    #[error("Cannot edit approved published posts. Create a new version instead.")]
    Locked,

    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    #[error("Only therapists can write blog posts")]
    NotATherapist,

    #[error("Only verified therapists and admins can review blog posts")]
    NotAModerator,

    #[error("Database error: {0}")]
    Database(String),
}

impl BlogError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        BlogError::Invalid { field, message: message.into() }
    }
}

impl From<SupabaseError> for BlogError {
    fn from(e: SupabaseError) -> Self {
        BlogError::Database(e.to_string())
    }
}

impl From<TherapistError> for BlogError {
    fn from(e: TherapistError) -> Self {
        BlogError::Database(e.to_string())
    }
}

impl From<BlogError> for AppError {
    fn from(e: BlogError) -> Self {
        let message = e.to_string();
        match e {
            BlogError::NotFound | BlogError::NotAuthor | BlogError::NotPending => AppError::NotFound(message),
            BlogError::Locked => AppError::BadRequest(message),
            BlogError::Invalid { field, .. } => AppError::field(field, message),
            BlogError::NotATherapist | BlogError::NotAModerator => AppError::Forbidden(message),
            BlogError::Database(msg) => AppError::Database(msg),
        }
    }
}
