//! Therapist-authored articles: drafting, moderation, public reading,
//! likes, comments, author statistics and content-based recommendations.
//!
//! Verified therapists publish directly. Everyone else submits for review
//! by an admin or a verified therapist.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::BlogError;
pub use models::*;
pub use router::blog_routes;
