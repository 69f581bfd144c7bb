//! In-memory `RemoteStore` used by the engine tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{QueryPage, RemoteError, RemoteResult, RemoteStore, UpdateOutcome};
use crate::models::{CaseRecord, RecordType, SummonsRecord};
use crate::property::{case_properties, summons_properties, PropertyBag, PropertyMap, LOCAL_ID_PROPERTY};

const CREATED_TIME: &str = "2024-03-01T10:00:00.000Z";
const EDITED_TIME: &str = "2024-03-02T12:30:00.000Z";

#[derive(Default)]
struct State {
    pages: BTreeMap<RecordType, Vec<Value>>,
    page_size: Option<usize>,
    query_failure: Option<u16>,
    create_failure: Option<u16>,
    looping_cursor: bool,
    hang: bool,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
    queries: AtomicUsize,
    updates: AtomicUsize,
    creates: AtomicUsize,
}

/// Build a remote page object the way the query endpoint returns it
pub fn page(id: &str, properties: PropertyMap) -> Value {
    json!({
        "object": "page",
        "id": id,
        "created_time": CREATED_TIME,
        "last_edited_time": EDITED_TIME,
        "archived": false,
        "in_trash": false,
        "properties": properties,
    })
}

pub fn case_page(case: &CaseRecord) -> Value {
    page(&case.id, case_properties(case))
}

pub fn summons_page(summons: &SummonsRecord) -> Value {
    page(&summons.id, summons_properties(summons))
}

fn page_id(page: &Value) -> Option<&str> {
    page.get("id").and_then(Value::as_str)
}

fn is_archived(page: &Value) -> bool {
    page.get("archived").and_then(Value::as_bool) == Some(true)
}

fn failure(status: u16) -> RemoteError {
    if matches!(status, 401 | 403) {
        RemoteError::Unauthorized { status }
    } else {
        RemoteError::Api {
            status,
            code: "internal_server_error".to_string(),
            message: "injected failure".to_string(),
        }
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, record_type: RecordType, page: Value) {
        self.state().pages.entry(record_type).or_default().push(page);
    }

    /// Drop a page entirely, as if it had been deleted remotely
    pub fn remove(&self, id: &str) {
        for pages in self.state().pages.values_mut() {
            pages.retain(|page| page_id(page) != Some(id));
        }
    }

    pub fn archive(&self, id: &str) {
        for pages in self.state().pages.values_mut() {
            for page in pages.iter_mut().filter(|page| page_id(page) == Some(id)) {
                page["archived"] = Value::Bool(true);
            }
        }
    }

    /// Overwrite properties of an existing page
    pub fn edit(&self, id: &str, properties: PropertyMap) {
        let mut state = self.state();
        for page in state.pages.values_mut().flatten() {
            if page_id(page) == Some(id) {
                merge(page, &properties);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.state()
            .pages
            .values()
            .flatten()
            .find(|page| page_id(page) == Some(id))
            .cloned()
    }

    pub fn ids(&self, record_type: RecordType) -> Vec<String> {
        self.state()
            .pages
            .get(&record_type)
            .map(|pages| {
                pages
                    .iter()
                    .filter(|page| !is_archived(page))
                    .filter_map(page_id)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_page_size(&self, size: usize) {
        self.state().page_size = Some(size.max(1));
    }

    pub fn fail_queries(&self, status: u16) {
        self.state().query_failure = Some(status);
    }

    pub fn fail_creates(&self, status: u16) {
        self.state().create_failure = Some(status);
    }

    pub fn loop_cursor(&self) {
        self.state().looping_cursor = true;
    }

    /// Make every call block far longer than any test timeout
    pub fn hang(&self) {
        self.state().hang = true;
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    async fn maybe_hang(&self) {
        let hang = self.state().hang;
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

fn merge(page: &mut Value, properties: &PropertyMap) {
    if let Some(Value::Object(existing)) = page.get_mut("properties") {
        for (name, value) in properties {
            existing.insert(name.clone(), value.clone());
        }
    }
}

impl RemoteStore for FakeRemote {
    async fn query_page(
        &self,
        record_type: RecordType,
        cursor: Option<&str>,
    ) -> RemoteResult<QueryPage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.maybe_hang().await;

        let state = self.state();
        if let Some(status) = state.query_failure {
            return Err(failure(status));
        }

        let pages = state.pages.get(&record_type).cloned().unwrap_or_default();
        let page_size = state.page_size.unwrap_or(100);
        let start = cursor.and_then(|cursor| cursor.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + page_size).min(pages.len());
        let results = pages.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();

        let next_cursor = if state.looping_cursor {
            Some("0".to_string())
        } else {
            (end < pages.len()).then(|| end.to_string())
        };

        Ok(QueryPage {
            results,
            next_cursor,
        })
    }

    async fn update_page(
        &self,
        page_id_to_update: &str,
        properties: &PropertyMap,
    ) -> RemoteResult<UpdateOutcome> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.maybe_hang().await;

        let mut state = self.state();
        let target = state
            .pages
            .values_mut()
            .flatten()
            .find(|page| page_id(page) == Some(page_id_to_update) && !is_archived(page));

        match target {
            Some(page) => {
                merge(page, properties);
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn create_page(
        &self,
        record_type: RecordType,
        properties: &PropertyMap,
    ) -> RemoteResult<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.maybe_hang().await;

        let mut state = self.state();
        if let Some(status) = state.create_failure {
            return Err(failure(status));
        }

        let id = Uuid::now_v7().to_string();
        state
            .pages
            .entry(record_type)
            .or_default()
            .push(page(&id, properties.clone()));
        Ok(id)
    }

    async fn find_by_local_id(
        &self,
        record_type: RecordType,
        local_id: &str,
    ) -> RemoteResult<Option<String>> {
        self.maybe_hang().await;

        let state = self.state();
        Ok(state.pages.get(&record_type).and_then(|pages| {
            pages
                .iter()
                .filter(|page| !is_archived(page))
                .find(|page| {
                    let properties = page
                        .get("properties")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_else(Map::new);
                    PropertyBag::new(properties).text(&[LOCAL_ID_PROPERTY]) == local_id
                })
                .and_then(page_id)
                .map(ToOwned::to_owned)
        }))
    }
}
