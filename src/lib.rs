pub mod cli;
pub mod config;
pub mod twilio;
pub mod usage;

pub use config::Settings;
pub use twilio::{Exception, TwilioClient, UsageError};
pub use usage::{UsageFilter, UsagePage, UsageRecord};
