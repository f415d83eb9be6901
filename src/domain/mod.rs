mod display_name;
mod notification_message;
mod subscriber_email;

pub use display_name::DisplayName;
pub use notification_message::{long_date, NotificationMessage};
pub use subscriber_email::{normalize, SubscriberEmail};
