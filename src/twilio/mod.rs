pub mod client;
pub mod error;
pub mod exception;

pub use client::{DEFAULT_BASE_URL, TwilioClient};
pub use error::{Result, UsageError};
pub use exception::Exception;
