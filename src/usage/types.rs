use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Filters for a usage records query.
///
/// Empty strings mean "omit this filter". Dates are either `YYYY-MM-DD` or a
/// relative offset such as `-30days`; they are passed to Twilio unchecked.
/// See <https://www.twilio.com/docs/usage/api/usage-record#read-multiple-usagerecord-resources>.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageFilter {
    pub category: String,
    pub start_date: String,
    pub end_date: String,
    pub include_subaccounts: bool,
}

impl UsageFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = start_date.into();
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = end_date.into();
        self
    }

    #[must_use]
    pub fn include_subaccounts(mut self, include: bool) -> Self {
        self.include_subaccounts = include;
        self
    }
}

/// Usage for one category over one date range.
///
/// Absent and `null` fields decode to their empty value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UsageRecord {
    #[serde(deserialize_with = "null_default")]
    pub account_sid: String,
    #[serde(deserialize_with = "null_default")]
    pub category: String,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
    #[serde(deserialize_with = "null_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_default")]
    pub end_date: String,
    #[serde(deserialize_with = "null_default")]
    pub price: String,
    #[serde(deserialize_with = "null_default")]
    pub price_unit: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub count: u64,
    #[serde(deserialize_with = "null_default")]
    pub count_unit: String,
    #[serde(deserialize_with = "null_default")]
    pub usage: String,
    #[serde(deserialize_with = "null_default")]
    pub usage_unit: String,
    /// GMT timestamp, `YYYY-MM-DDTHH:MM:SS+00:00`
    #[serde(deserialize_with = "null_default")]
    pub as_of: String,
    #[serde(
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub subresource_uris: BTreeMap<String, String>,
}

impl UsageRecord {
    #[must_use]
    pub fn as_of_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.as_of).ok()
    }

    #[must_use]
    pub fn price_value(&self) -> Option<f64> {
        self.price.trim().parse().ok()
    }

    #[must_use]
    pub fn usage_value(&self) -> Option<f64> {
        self.usage.trim().parse().ok()
    }
}

/// One page of the usage records listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsagePage {
    #[serde(deserialize_with = "null_default")]
    pub page_size: u32,
    #[serde(deserialize_with = "null_default")]
    pub page: u32,
    #[serde(deserialize_with = "null_default")]
    pub usage_records: Vec<UsageRecord>,
    pub next_page_uri: Option<String>,
}

impl UsagePage {
    /// The link to the following page, or `None` on the last page.
    #[must_use]
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// Twilio sends `count` as a numeric string; `null` counts as zero.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    const INVALID: &str = "count must be a numeric string";

    match Option::<Count>::deserialize(deserializer)
        .map_err(|_| serde::de::Error::custom(INVALID))?
    {
        None => Ok(0),
        Some(Count::Number(n)) => Ok(n),
        Some(Count::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(INVALID)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(count: &str) -> String {
        format!(
            r#"{{
                "account_sid": "AC123",
                "category": "sms",
                "description": "SMS Messages",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "price": "12.50",
                "price_unit": "usd",
                "count": {count},
                "count_unit": "messages",
                "usage": "1666",
                "usage_unit": "messages",
                "as_of": "2024-02-01T00:00:00+00:00",
                "subresource_uris": {{
                    "daily": "/2010-04-01/Accounts/AC123/Usage/Records/Daily.json?Category=sms"
                }}
            }}"#
        )
    }

    #[test]
    fn count_decodes_from_numeric_string() {
        let record: UsageRecord = serde_json::from_str(&record_json(r#""42""#)).unwrap();
        assert_eq!(record.count, 42);
    }

    #[test]
    fn zero_count_decodes() {
        let record: UsageRecord = serde_json::from_str(&record_json(r#""0""#)).unwrap();
        assert_eq!(record.count, 0);
    }

    #[test]
    fn count_accepts_bare_number() {
        let record: UsageRecord = serde_json::from_str(&record_json("7")).unwrap();
        assert_eq!(record.count, 7);
    }

    #[test]
    fn non_numeric_count_is_rejected() {
        let result = serde_json::from_str::<UsageRecord>(&record_json(r#""many""#));
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_count_names_the_field() {
        let err = serde_json::from_str::<UsageRecord>(&record_json(r#""many""#)).unwrap_err();
        assert!(err.to_string().contains("count must be a numeric string"));

        let err = serde_json::from_str::<UsageRecord>(&record_json("true")).unwrap_err();
        assert!(err.to_string().contains("count must be a numeric string"));
    }

    #[test]
    fn null_count_decodes_as_zero() {
        let record: UsageRecord = serde_json::from_str(&record_json("null")).unwrap();
        assert_eq!(record.count, 0);
    }

    #[test]
    fn null_string_fields_decode_as_empty() {
        let record: UsageRecord = serde_json::from_str(
            r#"{"category": "sms", "count": "1", "usage_unit": null, "price": null}"#,
        )
        .unwrap();
        assert_eq!(record.category, "sms");
        assert_eq!(record.count, 1);
        assert_eq!(record.usage_unit, "");
        assert_eq!(record.price, "");
        assert_eq!(record.price_value(), None);
    }

    #[test]
    fn null_in_every_record_field_is_accepted() {
        let record: UsageRecord = serde_json::from_str(
            r#"{
                "account_sid": null, "category": null, "description": null,
                "start_date": null, "end_date": null, "price": null,
                "price_unit": null, "count": null, "count_unit": null,
                "usage": null, "usage_unit": null, "as_of": null,
                "subresource_uris": null
            }"#,
        )
        .unwrap();
        assert_eq!(record, UsageRecord::default());
        assert!(record.as_of_time().is_none());
    }

    #[test]
    fn null_page_fields_decode_as_defaults() {
        let page: UsagePage = serde_json::from_str(
            r#"{"page": null, "page_size": null, "usage_records": null, "next_page_uri": null}"#,
        )
        .unwrap();
        assert_eq!(page.page, 0);
        assert_eq!(page.page_size, 0);
        assert!(page.usage_records.is_empty());
        assert!(page.next_page().is_none());
    }

    #[test]
    fn record_helpers_parse_numeric_fields() {
        let record: UsageRecord = serde_json::from_str(&record_json(r#""1666""#)).unwrap();
        assert_eq!(record.price_value(), Some(12.5));
        assert_eq!(record.usage_value(), Some(1666.0));
        let as_of = record.as_of_time().unwrap();
        assert_eq!(as_of.to_rfc3339(), "2024-02-01T00:00:00+00:00");
        assert_eq!(record.subresource_uris.len(), 1);
    }

    #[test]
    fn page_without_next_link_is_terminal() {
        let page: UsagePage =
            serde_json::from_str(r#"{"page": 0, "page_size": 50, "usage_records": []}"#).unwrap();
        assert!(page.next_page().is_none());

        let page: UsagePage = serde_json::from_str(
            r#"{"page": 0, "page_size": 50, "usage_records": [], "next_page_uri": null}"#,
        )
        .unwrap();
        assert!(page.next_page().is_none());

        let page: UsagePage = serde_json::from_str(
            r#"{"page": 0, "page_size": 50, "usage_records": [], "next_page_uri": ""}"#,
        )
        .unwrap();
        assert!(page.next_page().is_none());
    }

    #[test]
    fn filter_builder_sets_fields() {
        let filter = UsageFilter::new()
            .category("calls")
            .start_date("-30days")
            .end_date("2024-01-31")
            .include_subaccounts(true);
        assert_eq!(filter.category, "calls");
        assert_eq!(filter.start_date, "-30days");
        assert_eq!(filter.end_date, "2024-01-31");
        assert!(filter.include_subaccounts);
    }
}
