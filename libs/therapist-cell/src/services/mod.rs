pub mod availability;
pub mod directory;
pub mod schedule;
pub mod slots;

pub use availability::AvailabilityService;
pub use directory::DirectoryService;
pub use schedule::{resolve_day_windows, TimeRange, WeeklySchedule};
