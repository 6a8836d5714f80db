//! Usage records listing: filters, record types and the paginated fetch.
//!
//! See <https://www.twilio.com/docs/usage/api/usage-record>.

pub mod fetcher;
pub mod types;

pub use fetcher::{build_usage_query, resolve_next_page};
pub use types::{UsageFilter, UsagePage, UsageRecord};
