//! HTTP client for the Notion public API.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{QueryPage, RemoteError, RemoteResult, RemoteStore, UpdateOutcome};
use crate::config::NotionConfig;
use crate::models::RecordType;
use crate::property::{PropertyMap, LOCAL_ID_PROPERTY};
use crate::util::compact_text;

/// API version pinned in every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// Largest page size the query endpoint accepts
const QUERY_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct NotionClient {
    config: NotionConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NotionClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> RemoteResult<Self> {
        if config.token.trim().is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Notion token must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &NotionConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.config.api_base_url))
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn query_path(&self, record_type: RecordType) -> String {
        format!(
            "/v1/databases/{}/query",
            urlencoding::encode(self.config.database_id(record_type))
        )
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(response.json::<Value>().await?)
    }
}

impl RemoteStore for NotionClient {
    async fn query_page(
        &self,
        record_type: RecordType,
        cursor: Option<&str>,
    ) -> RemoteResult<QueryPage> {
        let mut body = json!({ "page_size": QUERY_PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = Value::String(cursor.to_string());
        }

        let request = self
            .request(Method::POST, &self.query_path(record_type))
            .json(&body);
        let page = parse_query_page(Self::send(request).await?)?;
        tracing::debug!(
            "Fetched {} {record_type} page(s), next_cursor={:?}",
            page.results.len(),
            page.next_cursor
        );
        Ok(page)
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &PropertyMap,
    ) -> RemoteResult<UpdateOutcome> {
        let path = format!("/v1/pages/{}", urlencoding::encode(page_id));
        let request = self
            .request(Method::PATCH, &path)
            .json(&json!({ "properties": properties }));

        match Self::send(request).await {
            Ok(_) => Ok(UpdateOutcome::Updated),
            Err(error) if is_missing_page(&error) => {
                tracing::debug!("Remote page {page_id} not updatable: {error}");
                Ok(UpdateOutcome::NotFound)
            }
            Err(error) => Err(error),
        }
    }

    async fn create_page(
        &self,
        record_type: RecordType,
        properties: &PropertyMap,
    ) -> RemoteResult<String> {
        let body = json!({
            "parent": { "database_id": self.config.database_id(record_type) },
            "properties": properties,
        });
        let request = self.request(Method::POST, "/v1/pages").json(&body);
        created_page_id(&Self::send(request).await?)
    }

    async fn find_by_local_id(
        &self,
        record_type: RecordType,
        local_id: &str,
    ) -> RemoteResult<Option<String>> {
        let body = json!({
            "page_size": 1,
            "filter": {
                "property": LOCAL_ID_PROPERTY,
                "rich_text": { "equals": local_id },
            },
        });
        let request = self
            .request(Method::POST, &self.query_path(record_type))
            .json(&body);

        match Self::send(request).await {
            Ok(value) => Ok(first_live_page_id(&parse_query_page(value)?.results)),
            // Databases without the tag property reject the filter; nothing can match.
            Err(RemoteError::Api { status: 400, code, .. }) if code == "validation_error" => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

/// Decode a query response; the cursor only counts while `has_more` is set.
fn parse_query_page(payload: Value) -> RemoteResult<QueryPage> {
    let response: QueryResponse = serde_json::from_value(payload)
        .map_err(|error| RemoteError::InvalidPayload(format!("query response: {error}")))?;
    Ok(QueryPage {
        results: response.results,
        next_cursor: response.next_cursor.filter(|_| response.has_more),
    })
}

/// Id of the first result that is neither archived nor in the trash
fn first_live_page_id(results: &[Value]) -> Option<String> {
    results.iter().find_map(|page| {
        let flagged = |key: &str| page.get(key).and_then(Value::as_bool) == Some(true);
        if flagged("archived") || flagged("in_trash") {
            return None;
        }
        page.get("id").and_then(Value::as_str).map(ToOwned::to_owned)
    })
}

fn created_page_id(payload: &Value) -> RemoteResult<String> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RemoteError::InvalidPayload("create response did not include id".to_string())
        })
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> RemoteError {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return RemoteError::Unauthorized {
            status: status.as_u16(),
        };
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|payload| payload.code.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let message = parsed
        .and_then(|payload| payload.message)
        .unwrap_or_else(|| compact_text(body));

    RemoteError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Whether an update failure means the page does not exist (or no longer
/// accepts edits) and should be recreated.
fn is_missing_page(error: &RemoteError) -> bool {
    match error {
        RemoteError::Api { status: 404, .. } => true,
        RemoteError::Api { code, .. } if code == "object_not_found" => true,
        RemoteError::Api {
            status: 400,
            code,
            message,
        } if code == "validation_error" => {
            let message = message.to_ascii_lowercase();
            message.contains("page_id")
                || message.contains("valid uuid")
                || message.contains("archived")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> NotionConfig {
        NotionConfig {
            token: "secret_abc".to_string(),
            cases_database_id: "cases-db".to_string(),
            summons_database_id: "summons-db".to_string(),
            api_base_url: "https://api.notion.com".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn rejects_empty_token() {
        let mut config = config();
        config.token = "  ".to_string();
        assert!(NotionClient::new(config).is_err());
    }

    #[test]
    fn query_path_targets_record_database() {
        let client = NotionClient::new(config()).unwrap();
        assert_eq!(
            client.query_path(RecordType::Summons),
            "/v1/databases/summons-db/query"
        );
    }

    #[test]
    fn debug_does_not_leak_token() {
        let client = NotionClient::new(config()).unwrap();
        assert!(!format!("{client:?}").contains("secret_abc"));
    }

    #[test]
    fn api_error_maps_auth_statuses() {
        assert!(matches!(
            api_error(StatusCode::UNAUTHORIZED, ""),
            RemoteError::Unauthorized { status: 401 }
        ));
        assert!(matches!(
            api_error(StatusCode::FORBIDDEN, "{}"),
            RemoteError::Unauthorized { status: 403 }
        ));
    }

    #[test]
    fn api_error_reads_error_body() {
        let error = api_error(
            StatusCode::NOT_FOUND,
            r#"{"object":"error","status":404,"code":"object_not_found","message":"Could not find page"}"#,
        );
        match error {
            RemoteError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, "object_not_found");
                assert_eq!(message, "Could not find page");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_page_classification() {
        let not_found = api_error(StatusCode::NOT_FOUND, r#"{"code":"object_not_found"}"#);
        assert!(is_missing_page(&not_found));

        let bad_id = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"validation_error","message":"path failed validation: path.page_id should be a valid uuid"}"#,
        );
        assert!(is_missing_page(&bad_id));

        let archived = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"validation_error","message":"Can't edit block that is archived."}"#,
        );
        assert!(is_missing_page(&archived));

        let bad_property = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"validation_error","message":"Status is expected to be select."}"#,
        );
        assert!(!is_missing_page(&bad_property));

        let rate_limited = api_error(StatusCode::TOO_MANY_REQUESTS, r#"{"code":"rate_limited"}"#);
        assert!(!is_missing_page(&rate_limited));
    }

    #[test]
    fn query_cursor_only_counts_while_more_pages_remain() {
        let more = parse_query_page(json!({
            "results": [{ "id": "a" }, { "id": "b" }],
            "has_more": true,
            "next_cursor": "cursor-2",
        }))
        .unwrap();
        assert_eq!(more.results.len(), 2);
        assert_eq!(more.next_cursor.as_deref(), Some("cursor-2"));

        let last = parse_query_page(json!({
            "results": [],
            "has_more": false,
            "next_cursor": "stale-cursor",
        }))
        .unwrap();
        assert_eq!(last.next_cursor, None);

        let bare = parse_query_page(json!({ "object": "list" })).unwrap();
        assert!(bare.results.is_empty());
        assert_eq!(bare.next_cursor, None);
    }

    #[test]
    fn malformed_query_response_is_invalid_payload() {
        let error = parse_query_page(json!({ "results": "nope" })).unwrap_err();
        assert!(matches!(error, RemoteError::InvalidPayload(_)));
    }

    #[test]
    fn local_id_lookup_skips_archived_and_trashed_pages() {
        let results = vec![
            json!({ "id": "archived", "archived": true }),
            json!({ "id": "trashed", "in_trash": true }),
            json!({ "id": "live", "archived": false }),
        ];
        assert_eq!(first_live_page_id(&results).as_deref(), Some("live"));
        assert_eq!(first_live_page_id(&results[..2]), None);
    }

    #[test]
    fn created_page_id_requires_an_id() {
        assert_eq!(created_page_id(&json!({ "id": " page-1 " })).unwrap(), "page-1");
        assert!(matches!(
            created_page_id(&json!({ "id": "" })),
            Err(RemoteError::InvalidPayload(_))
        ));
    }
}
