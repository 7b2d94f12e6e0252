use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use shared::{
    domain::{Record, RecordId},
    protocol::ApiResponse,
};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use crate::{
    view::{filter_records, paginate, PageSummary, PageWindow},
    Collaborator,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub id_field: String,
    /// Fields searched, in order, by the free-text filter.
    pub search_fields: Vec<String>,
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            search_fields: Vec::new(),
            page_size: PageWindow::default().page_size,
        }
    }
}

impl TableConfig {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            ..Self::default()
        }
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no collaborator configured to {operation}")]
    NoCollaborator { operation: &'static str },
    #[error("record is missing identifier field '{field}'")]
    MissingId { field: String },
    #[error("no record with identifier {0}")]
    UnknownRecord(RecordId),
    #[error("{0}")]
    RemoteRejection(String),
    #[error("API returned success but no data")]
    MalformedResponse,
    #[error("Failed to delete item {id}: {message}")]
    DeleteRejected { id: RecordId, message: String },
    #[error("Failed to delete item {id}: {source}")]
    DeleteFailed {
        id: RecordId,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to delete items: {0}")]
    BatchDeleteRejected(String),
    #[error(transparent)]
    Network(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    ItemAdded(Record),
    ItemUpdated(Record),
    ItemsDeleted(Vec<RecordId>),
    DataReplaced { count: usize },
    Failed(String),
}

struct TableState {
    data: Vec<Record>,
    selected: Vec<RecordId>,
    search_term: String,
    current_item: Option<Record>,
    is_loading: bool,
    error: Option<String>,
    pagination: PageWindow,
}

/// Client-side controller for a grid of records backed by a CRUD API.
///
/// Search, selection and paging are purely local. Mutations go through the
/// collaborator and touch the local collection only once it confirms success.
pub struct DataTable {
    config: TableConfig,
    collaborator: Option<Arc<dyn Collaborator>>,
    state: RwLock<TableState>,
    events: broadcast::Sender<TableEvent>,
}

impl DataTable {
    pub fn new(config: TableConfig, initial_data: Vec<Record>) -> Self {
        Self::with_optional_collaborator(config, initial_data, None)
    }

    pub fn new_with_collaborator(
        config: TableConfig,
        initial_data: Vec<Record>,
        collaborator: Arc<dyn Collaborator>,
    ) -> Self {
        Self::with_optional_collaborator(config, initial_data, Some(collaborator))
    }

    fn with_optional_collaborator(
        config: TableConfig,
        initial_data: Vec<Record>,
        collaborator: Option<Arc<dyn Collaborator>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let pagination = PageWindow {
            current_page: 1,
            page_size: config.page_size,
        };
        Self {
            config,
            collaborator,
            state: RwLock::new(TableState {
                data: initial_data,
                selected: Vec::new(),
                search_term: String::new(),
                current_item: None,
                is_loading: false,
                error: None,
                pagination,
            }),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }

    pub async fn data(&self) -> Vec<Record> {
        self.state.read().await.data.clone()
    }

    pub async fn filtered_data(&self) -> Vec<Record> {
        let state = self.state.read().await;
        filter_records(&state.data, &self.config.search_fields, &state.search_term)
    }

    pub async fn paginated_data(&self) -> Vec<Record> {
        let state = self.state.read().await;
        self.current_page_of(&state)
    }

    pub async fn page_summary(&self) -> PageSummary {
        let state = self.state.read().await;
        let filtered = filter_records(&state.data, &self.config.search_fields, &state.search_term);
        PageSummary::new(filtered.len(), state.data.len(), state.pagination)
    }

    pub async fn pagination(&self) -> PageWindow {
        self.state.read().await.pagination
    }

    pub async fn selected_rows(&self) -> Vec<RecordId> {
        self.state.read().await.selected.clone()
    }

    pub async fn is_selected(&self, id: &RecordId) -> bool {
        self.state.read().await.selected.contains(id)
    }

    pub async fn current_item(&self) -> Option<Record> {
        self.state.read().await.current_item.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Looks a record up by identifier in the unfiltered collection.
    pub async fn find(&self, id: &RecordId) -> Option<Record> {
        let state = self.state.read().await;
        state
            .data
            .iter()
            .find(|record| self.id_of(record).as_ref() == Some(id))
            .cloned()
    }

    /// Replaces the search term and returns to the first page.
    pub async fn set_search_term(&self, term: impl Into<String>) {
        let mut state = self.state.write().await;
        state.search_term = term.into();
        state.pagination.current_page = 1;
    }

    /// Selects every row of the current page, or clears the selection when it
    /// already has as many entries as the page has rows.
    pub async fn toggle_select_all(&self) {
        let mut state = self.state.write().await;
        let page_ids: Vec<RecordId> = self
            .current_page_of(&state)
            .iter()
            .filter_map(|record| self.id_of(record))
            .collect();

        if !page_ids.is_empty() && state.selected.len() == page_ids.len() {
            state.selected.clear();
        } else {
            state.selected = page_ids;
        }
    }

    pub async fn toggle_select_row(&self, id: RecordId) {
        let mut state = self.state.write().await;
        if let Some(pos) = state.selected.iter().position(|selected| *selected == id) {
            state.selected.remove(pos);
        } else {
            state.selected.push(id);
        }
    }

    pub async fn set_selected_rows(&self, ids: Vec<RecordId>) {
        let mut deduped: Vec<RecordId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        self.state.write().await.selected = deduped;
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected.clear();
    }

    pub async fn set_current_item(&self, item: Option<Record>) {
        self.state.write().await.current_item = item;
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Replaces the whole collection, e.g. after reloading from the API.
    pub async fn set_data(&self, records: Vec<Record>) {
        let count = records.len();
        self.state.write().await.data = records;
        let _ = self.events.send(TableEvent::DataReplaced { count });
    }

    pub async fn go_to_page(&self, page: usize) {
        self.state.write().await.pagination.current_page = page;
    }

    pub async fn set_page_size(&self, page_size: usize) {
        let mut state = self.state.write().await;
        state.pagination.page_size = page_size;
        state.pagination.current_page = 1;
    }

    pub async fn add_item(&self, item: Record) -> Result<Record, TableError> {
        let collaborator = self.require_collaborator("add items")?;

        self.begin_mutation().await;
        let result = async {
            let response = collaborator.create(&item).await?;
            expect_record(response, "Failed to add item")
        }
        .await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(created) => {
                state.data.push(created.clone());
                drop(state);
                info!(id = ?self.id_of(&created), "data table: item added");
                let _ = self.events.send(TableEvent::ItemAdded(created.clone()));
                Ok(created)
            }
            Err(err) => Err(self.fail(state, err)),
        }
    }

    pub async fn edit_item(&self, item: Record) -> Result<Record, TableError> {
        let collaborator = self.require_collaborator("edit items")?;

        self.begin_mutation().await;
        let result = async {
            let id = self.id_of(&item).ok_or_else(|| TableError::MissingId {
                field: self.config.id_field.clone(),
            })?;
            if self.find(&id).await.is_none() {
                return Err(TableError::UnknownRecord(id));
            }
            let response = collaborator.update(&id, &item).await?;
            expect_record(response, "Failed to update item")
        }
        .await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(updated) => {
                let updated_id = self.id_of(&updated);
                for record in state.data.iter_mut() {
                    if updated_id.is_some() && self.id_of(record) == updated_id {
                        *record = updated.clone();
                    }
                }
                drop(state);
                info!(id = ?updated_id, "data table: item updated");
                let _ = self.events.send(TableEvent::ItemUpdated(updated.clone()));
                Ok(updated)
            }
            Err(err) => Err(self.fail(state, err)),
        }
    }

    /// Deletes `ids` through the collaborator, all or nothing.
    ///
    /// Requests are issued concurrently and all of them run to completion. Any
    /// failure leaves the collection and selection untouched and reports the
    /// first error to arrive.
    pub async fn delete_items(&self, ids: &[RecordId]) -> Result<(), TableError> {
        let Some(collaborator) = self.collaborator.clone() else {
            return Ok(());
        };
        if ids.is_empty() {
            return Ok(());
        }

        self.begin_mutation().await;
        let result = if ids.len() > 1 && collaborator.supports_remove_batch() {
            remove_batch(collaborator.as_ref(), ids).await
        } else {
            remove_each(collaborator.as_ref(), ids).await
        };

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(()) => {
                state.data.retain(|record| {
                    self.id_of(record)
                        .map_or(true, |id| !ids.contains(&id))
                });
                state.selected.retain(|id| !ids.contains(id));
                drop(state);
                info!(count = ids.len(), "data table: items deleted");
                let _ = self.events.send(TableEvent::ItemsDeleted(ids.to_vec()));
                Ok(())
            }
            Err(err) => Err(self.fail(state, err)),
        }
    }

    fn require_collaborator(
        &self,
        operation: &'static str,
    ) -> Result<Arc<dyn Collaborator>, TableError> {
        self.collaborator
            .clone()
            .ok_or(TableError::NoCollaborator { operation })
    }

    async fn begin_mutation(&self) {
        let mut state = self.state.write().await;
        state.is_loading = true;
        state.error = None;
    }

    fn fail(
        &self,
        mut state: tokio::sync::RwLockWriteGuard<'_, TableState>,
        err: TableError,
    ) -> TableError {
        let message = err.to_string();
        state.error = Some(message.clone());
        drop(state);
        error!("data table: {message}");
        let _ = self.events.send(TableEvent::Failed(message));
        err
    }

    fn id_of(&self, record: &Record) -> Option<RecordId> {
        RecordId::of(record, &self.config.id_field)
    }

    fn current_page_of(&self, state: &TableState) -> Vec<Record> {
        let filtered = filter_records(&state.data, &self.config.search_fields, &state.search_term);
        paginate(&filtered, state.pagination)
    }
}

fn expect_record(
    response: ApiResponse<Record>,
    default_message: &str,
) -> Result<Record, TableError> {
    if !response.success {
        return Err(TableError::RemoteRejection(
            response
                .message
                .unwrap_or_else(|| default_message.to_string()),
        ));
    }
    response.data.ok_or(TableError::MalformedResponse)
}

async fn remove_one(collaborator: &dyn Collaborator, id: &RecordId) -> Result<(), TableError> {
    let response: ApiResponse<Value> =
        collaborator
            .remove(id)
            .await
            .map_err(|source| TableError::DeleteFailed {
                id: id.clone(),
                source,
            })?;
    if !response.success {
        warn!(%id, "data table: delete rejected");
        return Err(TableError::DeleteRejected {
            id: id.clone(),
            message: response
                .message
                .unwrap_or_else(|| "rejected by API".to_string()),
        });
    }
    Ok(())
}

async fn remove_each(collaborator: &dyn Collaborator, ids: &[RecordId]) -> Result<(), TableError> {
    let mut pending: FuturesUnordered<_> = ids
        .iter()
        .map(|id| remove_one(collaborator, id))
        .collect();
    let mut first_error = None;
    while let Some(outcome) = pending.next().await {
        if let Err(err) = outcome {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

async fn remove_batch(collaborator: &dyn Collaborator, ids: &[RecordId]) -> Result<(), TableError> {
    let response = collaborator.remove_batch(ids).await?;
    if !response.success {
        return Err(TableError::BatchDeleteRejected(
            response
                .message
                .unwrap_or_else(|| "rejected by API".to_string()),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/data_table_tests.rs"]
mod tests;
