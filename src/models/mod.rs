pub mod job;
pub mod notification;
pub mod workout_entry;

// Re-export core models for easy access
pub use job::{Job, JobStatusView, NewJob};
pub use notification::JobNotification;
pub use workout_entry::WorkoutEntry;
