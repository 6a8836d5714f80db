use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::{Url, form_urlencoded};

use super::types::{UsageFilter, UsagePage, UsageRecord};
use crate::twilio::{Result, TwilioClient, UsageError};

impl TwilioClient {
    /// Fetch every usage record matching `filter`, following pagination to the end.
    ///
    /// # Errors
    ///
    /// [`UsageError::Exception`] when Twilio rejects any page; any other
    /// variant for transport, decode or URL failures. Records from earlier
    /// pages are discarded in both cases.
    pub async fn fetch_usage(&self, filter: &UsageFilter) -> Result<Vec<UsageRecord>> {
        self.fetch_usage_with_cancel(filter, &CancellationToken::new())
            .await
    }

    /// Like [`TwilioClient::fetch_usage`], aborting with
    /// [`UsageError::Cancelled`] once `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`TwilioClient::fetch_usage`].
    #[instrument(skip(self, cancel), fields(account_sid = %self.account_sid()))]
    pub async fn fetch_usage_with_cancel(
        &self,
        filter: &UsageFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<UsageRecord>> {
        let mut url = self.usage_records_url(filter)?;
        let mut records = Vec::new();
        let mut pages = 0_usize;

        loop {
            let body = self.get(&url, cancel).await.inspect_err(|e| {
                if let Some(exception) = e.exception() {
                    warn!(%exception, "Twilio rejected usage request");
                }
            })?;

            let page: UsagePage = serde_json::from_str(&body)?;
            pages += 1;
            debug!(
                page = page.page,
                page_size = page.page_size,
                records = page.usage_records.len(),
                "Fetched usage page"
            );

            let next = page.next_page().map(str::to_owned);
            records.extend(page.usage_records);

            match next {
                Some(next) => url = resolve_next_page(self.base_url(), &next)?,
                None => break,
            }
        }

        info!(pages, records = records.len(), "Usage fetch complete");
        Ok(records)
    }

    fn usage_records_url(&self, filter: &UsageFilter) -> Result<Url> {
        let url = format!(
            "{}/Accounts/{}/Usage/Records.json?{}",
            self.base_url(),
            self.account_sid(),
            build_usage_query(filter)
        );
        Ok(Url::parse(&url)?)
    }
}

/// Encode the query string for a usage records request.
///
/// Empty filters are left out; `IncludeSubaccounts` is always present.
pub fn build_usage_query(filter: &UsageFilter) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !filter.category.is_empty() {
        query.append_pair("Category", &filter.category);
    }
    if !filter.start_date.is_empty() {
        query.append_pair("StartDate", &filter.start_date);
    }
    if !filter.end_date.is_empty() {
        query.append_pair("EndDate", &filter.end_date);
    }
    query.append_pair(
        "IncludeSubaccounts",
        if filter.include_subaccounts {
            "true"
        } else {
            "false"
        },
    );
    query.finish()
}

/// Turn a `next_page_uri` into a request URL under `base_url`.
///
/// Twilio returns links rooted at the host (`/2010-04-01/Accounts/...`) while
/// `base_url` already ends with the version segment. The link is treated as a
/// path under the API root: a link carrying the whole base path is joined to
/// the base origin, a link carrying only the version segment has that
/// segment dropped, anything else is appended as is.
///
/// # Errors
///
/// Absolute links to another origin and links that are not paths are
/// rejected with [`UsageError::InvalidNextPage`].
pub fn resolve_next_page(base_url: &str, next_page_uri: &str) -> Result<Url> {
    let base = Url::parse(base_url)?;

    if let Ok(absolute) = Url::parse(next_page_uri) {
        if absolute.origin() != base.origin() {
            return Err(UsageError::InvalidNextPage(next_page_uri.to_string()));
        }
        return Ok(absolute);
    }

    if !next_page_uri.starts_with('/') {
        return Err(UsageError::InvalidNextPage(next_page_uri.to_string()));
    }

    let base_path = base.path().trim_end_matches('/');
    if !base_path.is_empty() && strip_path_prefix(next_page_uri, base_path).is_some() {
        return Ok(base.join(next_page_uri)?);
    }

    let relative = base_path
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .and_then(|segment| strip_path_prefix(next_page_uri, &format!("/{segment}")))
        .unwrap_or(next_page_uri);

    Ok(Url::parse(&format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        relative
    ))?)
}

// Strip `prefix` only at a path-segment boundary.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')).then_some(rest)
}
