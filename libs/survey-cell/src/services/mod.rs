pub mod answers;
pub mod orchestrator;
pub mod prompts;

pub use orchestrator::SurveyService;
