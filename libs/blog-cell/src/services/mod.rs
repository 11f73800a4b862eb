pub mod engagement;
pub mod moderation;
pub mod posts;
pub mod recommender;
pub mod slug;
pub mod validation;

pub use engagement::EngagementService;
pub use moderation::ModerationService;
pub use posts::BlogService;
pub use recommender::{rank, RecommendationService};
pub use slug::{slugify, unique_slug};
