//! Supabase PostgREST implementation of [`HabitRemote`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{CompletionRecord, HabitPositionRow, HabitRecord, HabitRemote, NewHabit};
use crate::models::{DayKey, HabitFields, HabitId};
use crate::util::compact_text;
use crate::{Error, Result};

const HABITS_TABLE: &str = "habits";
const COMPLETIONS_TABLE: &str = "habit_completions";
const HABIT_ORDER: &str = "position.asc.nullslast,created_at.asc,id.asc";
const COMPLETION_ORDER: &str = "id.asc";

/// Rows requested per page; Supabase caps responses at 1000 rows by default.
const PAGE_SIZE: usize = 1000;

/// Default per-request timeout for table requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Table client authenticated with a user's access token.
#[derive(Clone)]
pub struct PostgrestRemote {
    rest_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl std::fmt::Debug for PostgrestRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PostgrestRemote")
            .field("rest_url", &self.rest_url)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PostgrestRemote {
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        Self::with_timeout(url, anon_key, access_token, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::InvalidInput(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token: access_token.into(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote(parse_api_error(status, &body)))
    }

    /// One `limit`/`offset` page of `request`, with the total row count when
    /// the server reports it.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        offset: usize,
    ) -> Result<Page<T>> {
        let request = request
            .query(&[("limit", PAGE_SIZE), ("offset", offset)])
            .header("Prefer", "count=exact");
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Page {
                rows: Vec::new(),
                total: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total);
        Ok(Page {
            rows: response.json().await?,
            total,
        })
    }
}

/// A single page of rows from a listing request.
struct Page<T> {
    rows: Vec<T>,
    total: Option<usize>,
}

/// Request pages until the reported total is reached, or, without a total,
/// until a page comes back shorter than `page_size`.
async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut rows = Vec::new();
    loop {
        let page = fetch(rows.len()).await?;
        let fetched = page.rows.len();
        rows.extend(page.rows);

        let done = match page.total {
            Some(total) => rows.len() >= total,
            None => fetched < page_size,
        };
        if fetched == 0 || done {
            return Ok(rows);
        }
        tracing::debug!(fetched = rows.len(), "Fetching next page");
    }
}

/// Total from a `Content-Range` value such as `0-999/2500`.
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl HabitRemote for PostgrestRemote {
    async fn list_habits(&self, user_id: &str) -> Result<Vec<HabitRecord>> {
        tracing::debug!(user_id, "Listing habits");
        collect_pages(PAGE_SIZE, move |offset| {
            let request = self.table(Method::GET, HABITS_TABLE).query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", HABIT_ORDER.to_string()),
            ]);
            self.fetch_page(request, offset)
        })
        .await
    }

    async fn list_completions(&self, habit_ids: &[HabitId]) -> Result<Vec<CompletionRecord>> {
        if habit_ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(habits = habit_ids.len(), "Listing completions");
        let filter = in_filter(habit_ids);
        collect_pages(PAGE_SIZE, move |offset| {
            let request = self.table(Method::GET, COMPLETIONS_TABLE).query(&[
                ("select", "id,habit_id,completion_date".to_string()),
                ("habit_id", filter.clone()),
                ("order", COMPLETION_ORDER.to_string()),
            ]);
            self.fetch_page(request, offset)
        })
        .await
    }

    async fn create_habit(&self, habit: &NewHabit) -> Result<HabitRecord> {
        let request = self
            .table(Method::POST, HABITS_TABLE)
            .header("Prefer", "return=representation")
            .json(&[habit]);
        let rows: Vec<HabitRecord> = self.send(request).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Remote("Insert did not return the created habit".to_string()))
    }

    async fn update_habit(&self, id: &HabitId, fields: &HabitFields) -> Result<HabitRecord> {
        let request = self
            .table(Method::PATCH, HABITS_TABLE)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(fields);
        let rows: Vec<HabitRecord> = self.send(request).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<()> {
        let request = self
            .table(Method::DELETE, HABITS_TABLE)
            .query(&[("id", format!("eq.{id}"))]);
        self.send(request).await?;
        Ok(())
    }

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        day: DayKey,
    ) -> Result<Option<CompletionRecord>> {
        let request = self.table(Method::GET, COMPLETIONS_TABLE).query(&[
            ("select", "id,habit_id,completion_date".to_string()),
            ("habit_id", format!("eq.{habit_id}")),
            ("completion_date", format!("eq.{day}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<CompletionRecord> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_completion(&self, habit_id: &HabitId, day: DayKey) -> Result<()> {
        let payload = serde_json::json!([{
            "habit_id": habit_id,
            "completion_date": day,
        }]);
        let response = self
            .table(Method::POST, COMPLETIONS_TABLE)
            .header("Prefer", "return=minimal")
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Unique (habit_id, completion_date) constraint: the row already exists.
            StatusCode::CONFLICT => {
                tracing::debug!(habit_id = %habit_id, %day, "Completion already stored");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Remote(parse_api_error(status, &body)))
            }
        }
    }

    async fn delete_completion(&self, completion_id: &str) -> Result<()> {
        let request = self
            .table(Method::DELETE, COMPLETIONS_TABLE)
            .query(&[("id", format!("eq.{completion_id}"))]);
        self.send(request).await?;
        Ok(())
    }

    async fn update_habit_positions(&self, rows: &[HabitPositionRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        // One upsert statement, so the reorder lands in a single transaction.
        let request = self
            .table(Method::POST, HABITS_TABLE)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.send(request).await?;
        Ok(())
    }
}

/// Normalize a project URL to its `/rest/v1` base.
pub fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !crate::util::is_http_url(trimmed) {
        return Err(Error::InvalidInput(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

fn in_filter(ids: &[HabitId]) -> String {
    let quoted = ids
        .iter()
        .map(|id| format!("\"{}\"", id.as_str().replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({quoted})")
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message {
            let mut rendered = message.trim().to_string();
            if let Some(details) = payload.details.filter(|details| !details.trim().is_empty()) {
                rendered = format!("{rendered}: {}", details.trim());
            }
            return match payload.code {
                Some(code) => format!("{rendered} [{code}] ({})", status.as_u16()),
                None => format!("{rendered} ({})", status.as_u16()),
            };
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
        assert!(normalize_rest_url("demo.supabase.co").is_err());
        assert!(normalize_rest_url("  ").is_err());
    }

    #[test]
    fn in_filter_quotes_each_id() {
        let ids = vec![HabitId::new("a-1"), HabitId::new("b-2")];
        assert_eq!(in_filter(&ids), "in.(\"a-1\",\"b-2\")");
    }

    #[test]
    fn parse_api_error_prefers_postgrest_message() {
        let body = r#"{"code":"23505","message":"duplicate key value","details":"Key exists.","hint":null}"#;
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, body),
            "duplicate key value: Key exists. [23505] (409)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502)"
        );
    }

    /// Serves `rows` the way PostgREST does when the project caps responses
    /// at `max_rows`.
    fn serve(
        rows: &[u32],
        offset: usize,
        max_rows: usize,
        report_total: bool,
    ) -> Result<Page<u32>> {
        let end = rows.len().min(offset + PAGE_SIZE.min(max_rows));
        Ok(Page {
            rows: rows.get(offset..end).unwrap_or_default().to_vec(),
            total: report_total.then_some(rows.len()),
        })
    }

    #[tokio::test]
    async fn collect_pages_reads_past_first_page() {
        let rows = (0..2500).collect::<Vec<u32>>();
        let mut requests = 0;

        let fetched = collect_pages(PAGE_SIZE, |offset| {
            requests += 1;
            std::future::ready(serve(&rows, offset, PAGE_SIZE, true))
        })
        .await
        .unwrap();

        assert_eq!(fetched, rows);
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn collect_pages_honors_lower_server_cap_with_total() {
        let rows = (0..1200).collect::<Vec<u32>>();

        let fetched = collect_pages(PAGE_SIZE, |offset| {
            std::future::ready(serve(&rows, offset, 500, true))
        })
        .await
        .unwrap();

        assert_eq!(fetched.len(), 1200);
    }

    #[tokio::test]
    async fn collect_pages_without_total_stops_on_short_page() {
        let rows = (0..2000).collect::<Vec<u32>>();
        let mut requests = 0;

        let fetched = collect_pages(PAGE_SIZE, |offset| {
            requests += 1;
            std::future::ready(serve(&rows, offset, PAGE_SIZE, false))
        })
        .await
        .unwrap();

        assert_eq!(fetched.len(), 2000);
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn collect_pages_propagates_errors() {
        let result = collect_pages::<u32, _, _>(PAGE_SIZE, |_| {
            std::future::ready(Err(Error::Remote("boom".to_string())))
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn content_range_total_reads_count() {
        assert_eq!(content_range_total("0-999/2500"), Some(2500));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn remote_debug_redacts_token() {
        let remote = PostgrestRemote::new("https://demo.supabase.co", "anon", "secret-token")
            .unwrap();
        let rendered = format!("{remote:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn remote_requires_anon_key() {
        assert!(PostgrestRemote::new("https://demo.supabase.co", " ", "token").is_err());
    }
}
