pub mod analytics;
pub mod entries;

pub use analytics::{mood_distribution, mood_trend, summarize};
pub use entries::JournalService;
