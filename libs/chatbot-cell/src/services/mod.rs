pub mod chat;
pub mod crisis;

pub use chat::ChatService;
pub use crisis::check_crisis;
