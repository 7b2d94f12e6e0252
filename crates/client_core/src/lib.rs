use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{Record, RecordId},
    protocol::ApiResponse,
};

mod company_api;
mod config;
mod data_table;
pub mod view;

pub use company_api::CompanyApiClient;
pub use config::ApiConfig;
pub use data_table::{DataTable, TableConfig, TableError, TableEvent};

/// External CRUD backend the table delegates mutations to.
///
/// `Err` means the call itself failed (transport, timeout); an `Ok` response
/// with `success == false` means the backend rejected the request.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn create(&self, payload: &Record) -> Result<ApiResponse<Record>>;
    async fn update(&self, id: &RecordId, payload: &Record) -> Result<ApiResponse<Record>>;
    async fn remove(&self, id: &RecordId) -> Result<ApiResponse<Value>>;

    fn supports_remove_batch(&self) -> bool {
        false
    }

    async fn remove_batch(&self, ids: &[RecordId]) -> Result<ApiResponse<Value>> {
        Err(anyhow!(
            "batch removal is unavailable ({} ids requested)",
            ids.len()
        ))
    }
}
