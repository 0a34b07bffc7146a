pub mod notification;
pub mod submission;

pub use notification::{Notification, QueuedNotification};
pub use submission::{NewSubmission, Submission};
