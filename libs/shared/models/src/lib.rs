pub mod auth;
pub mod error;
pub mod pagination;

pub use auth::{Role, User};
pub use error::AppError;
pub use pagination::{Page, PageRequest};
