//! Private mood journal for patients, with mood distribution, daily
//! intensity trend and summary analytics over the stored entries.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::journal_routes;
