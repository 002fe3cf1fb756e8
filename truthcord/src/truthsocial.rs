//! Upstream post client for the Truth Social (Mastodon-compatible) API.
//!
//! Statuses are read page by page with `max_id` cursors, newest first, and the
//! walk stops at the first post that is not newer than the caller's cutoff.
//! The cursor comes from the raw record ids, so a page of unparseable
//! statuses is skipped rather than read as the end of the timeline.
//! Account handles are resolved to numeric ids once and memoised in an
//! [`AccountIdCache`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use truthcord_core::contract::{FetchError, PostSource};
use truthcord_core::post::{compare_ids, Post};

pub const DEFAULT_API_BASE_URL: &str = "https://truthsocial.com/api";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Append-only map from account handle to upstream account id.
#[derive(Debug, Default)]
pub struct AccountIdCache {
    ids: Mutex<HashMap<String, String>>,
}

impl AccountIdCache {
    pub fn get(&self, handle: &str) -> Option<String> {
        self.ids.lock().ok()?.get(handle).cloned()
    }

    /// Records `id` for `handle` unless one is already known.
    pub fn insert(&self, handle: &str, id: String) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.entry(handle.to_string()).or_insert(id);
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    id: Option<String>,
    error: Option<String>,
}

/// Parsed posts of one page plus the `max_id` cursor for the next one, taken
/// from the raw records so unparseable statuses cannot end the walk early.
struct StatusPage {
    posts: Vec<Post>,
    next_max_id: Option<String>,
}

pub struct TruthSocialClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    accounts: AccountIdCache,
}

impl TruthSocialClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, token_set = token.is_some(), "Initialized upstream client");
        Ok(Self {
            http,
            base_url,
            token,
            accounts: AccountIdCache::default(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(format!("{path}: {e}")))?;

        if let Some(error) = body.get("error") {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(FetchError::Upstream(format!("{status}: {message}")));
        }
        if !status.is_success() {
            return Err(FetchError::Upstream(format!("{path} answered with status {status}")));
        }
        Ok(body)
    }

    /// Upstream id for `handle`, looked up once per handle.
    pub async fn account_id(&self, handle: &str) -> Result<String, FetchError> {
        if let Some(id) = self.accounts.get(handle) {
            return Ok(id);
        }
        let lookup_error = |reason: String| FetchError::Lookup {
            account: handle.to_string(),
            reason,
        };
        let body = self
            .get_json("/v1/accounts/lookup", &[("acct", handle)])
            .await
            .map_err(|e| lookup_error(e.to_string()))?;
        let lookup: LookupResponse =
            serde_json::from_value(body).map_err(|e| lookup_error(e.to_string()))?;
        let id = match (lookup.id, lookup.error) {
            (Some(id), _) => id,
            (None, Some(error)) => return Err(lookup_error(error)),
            (None, None) => return Err(lookup_error("response carried no id".to_string())),
        };
        debug!(account = handle, account_id = %id, "Resolved account id");
        self.accounts.insert(handle, id.clone());
        Ok(id)
    }

    /// One page of statuses, sorted newest first. Records that fail to
    /// deserialize are dropped with a warning but still move the cursor.
    async fn fetch_page(
        &self,
        account_id: &str,
        max_id: Option<&str>,
    ) -> Result<StatusPage, FetchError> {
        let mut query = vec![("exclude_replies", "true")];
        if let Some(max_id) = max_id {
            query.push(("max_id", max_id));
        }
        let path = format!("/v1/accounts/{account_id}/statuses");
        let body = self.get_json(&path, &query).await?;
        let Value::Array(records) = body else {
            return Err(FetchError::Payload(format!("{path}: expected a list of statuses")));
        };

        let raw_count = records.len();
        let next_max_id = records
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_str))
            .min_by(|a, b| compare_ids(a, b))
            .map(str::to_string);
        let mut posts: Vec<Post> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Post>(record) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!(error = %e, account_id, "Skipping malformed status");
                    None
                }
            })
            .collect();
        posts.sort_by(|a, b| compare_ids(&b.id, &a.id));

        if posts.is_empty() && raw_count > 0 {
            warn!(account_id, ?max_id, raw_count, ?next_max_id, "No usable status on page");
        }
        debug!(account_id, ?max_id, count = posts.len(), "Fetched statuses page");
        Ok(StatusPage { posts, next_max_id })
    }

    /// Lazily walks the account's statuses, newest page first, until a page
    /// carries no record ids.
    pub fn pages<'a>(
        &'a self,
        account_id: &'a str,
    ) -> impl Stream<Item = Result<Vec<Post>, FetchError>> + 'a {
        futures::stream::try_unfold(Some(None::<String>), move |cursor| async move {
            let Some(max_id) = cursor else {
                return Ok::<_, FetchError>(None);
            };
            let page = self.fetch_page(account_id, max_id.as_deref()).await?;
            let next = match page.next_max_id {
                // A cursor that does not move would fetch the same page forever.
                Some(next) if Some(&next) != max_id.as_ref() => Some(Some(next)),
                _ => None,
            };
            if next.is_none() && page.posts.is_empty() {
                return Ok(None);
            }
            Ok(Some((page.posts, next)))
        })
    }
}

#[async_trait]
impl PostSource for TruthSocialClient {
    async fn fetch_posts(
        &self,
        account: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<Post>, FetchError> {
        let account_id = self.account_id(account).await?;
        let pulled_at = Utc::now();
        let mut fresh = Vec::new();

        let pages = self.pages(&account_id);
        futures::pin_mut!(pages);
        'pages: while let Some(page) = pages.try_next().await? {
            for mut post in page {
                if post.created_at <= created_after {
                    break 'pages;
                }
                post.mark_pulled(pulled_at);
                fresh.push(post);
            }
        }

        debug!(account, since = %created_after, count = fresh.len(), "Fetched new posts");
        Ok(fresh)
    }
}
