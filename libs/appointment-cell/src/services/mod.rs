pub mod booking;
pub mod feedback;
pub mod lifecycle;
pub mod listing;
pub mod notification;
pub mod validation;

pub use booking::AppointmentBookingService;
pub use feedback::FeedbackService;
pub use lifecycle::AppointmentLifecycleService;
pub use listing::{AppointmentListingService, Participant};
pub use notification::NotificationService;
